// src/types/connection.rs

use serde::{Deserialize, Serialize};

use super::commit_info::CommitInfo;

/// A page of nodes as handed to the filtered connection widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub nodes: Vec<N>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
}

pub type CommitConnection = Connection<CommitInfo>;

impl<N> Connection<N> {
    pub fn new(nodes: Vec<N>) -> Self {
        Self {
            nodes,
            total_count: None,
            page_info: None,
        }
    }

    /// Whether asking for more than `first` nodes would return anything new.
    pub fn has_next_page(&self, first: u32) -> bool {
        if let Some(page_info) = self.page_info {
            return page_info.has_next_page;
        }
        match self.total_count {
            Some(total) => total > 0 && self.nodes.len() < total,
            None => self.nodes.len() >= first as usize && first > 0,
        }
    }
}
