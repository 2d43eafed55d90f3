// src/types/mod.rs

pub mod commit_info;
pub mod connection;
pub mod repo_id;
