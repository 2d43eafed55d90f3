// src/lib.rs

pub mod app;
pub mod commit_node;
pub mod commits;
pub mod config;
pub mod connection;
pub mod error;
pub mod git;
pub mod graphql;
pub mod navigation;
pub mod sidebar;
#[cfg(test)]
mod test_support;
pub mod types;
pub mod ui;
