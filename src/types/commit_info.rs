// src/types/commit_info.rs

use serde::{Deserialize, Serialize};

/// One commit as returned by the `GitCommitFields` selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommitInfo {
    pub id: String,
    pub oid: String,
    #[serde(rename = "abbreviatedOID")]
    pub abbreviated_oid: String,
    pub subject: String,
    pub body: Option<String>,
    pub author: Signature,
    pub committer: Option<Signature>,
    pub parents: Vec<ParentInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signature {
    pub person: Person,
    /// RFC 3339 timestamp.
    pub date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentInfo {
    pub oid: String,
    #[serde(rename = "abbreviatedOID")]
    pub abbreviated_oid: String,
}

impl CommitInfo {
    /// Short hash for display, falling back to a prefix of the full oid.
    pub fn short_oid(&self) -> &str {
        if !self.abbreviated_oid.is_empty() {
            &self.abbreviated_oid
        } else {
            abbreviate_oid(&self.oid)
        }
    }
}

/// The first seven characters of `oid`.
pub fn abbreviate_oid(oid: &str) -> &str {
    match oid.char_indices().nth(7) {
        Some((end, _)) => &oid[..end],
        None => oid,
    }
}
