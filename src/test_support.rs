// src/test_support.rs

use crate::error::{QueryError, Result};
use crate::graphql::{GraphQLRequest, QueryBackend};
use crate::types::commit_info::{CommitInfo, Person, Signature};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Answers every request with a canned response and records what it saw.
pub struct FakeBackend {
    response: std::result::Result<Value, String>,
    requests: Mutex<Vec<GraphQLRequest>>,
}

impl FakeBackend {
    pub fn new(response: Value) -> Self {
        Self {
            response: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GraphQLRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl QueryBackend for FakeBackend {
    fn execute(&self, request: &GraphQLRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.clone().map_err(QueryError::Transport)
    }
}

pub fn sample_commit(oid: &str, subject: &str) -> CommitInfo {
    CommitInfo {
        id: format!("GitCommit:{oid}"),
        oid: oid.to_string(),
        abbreviated_oid: oid[..oid.len().min(7)].to_string(),
        subject: subject.to_string(),
        body: None,
        author: Signature {
            person: Person {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            date: "2024-01-01T00:00:00Z".to_string(),
        },
        committer: None,
        parents: Vec::new(),
    }
}

pub fn ancestors_response(commits: &[CommitInfo]) -> Value {
    json!({
        "data": {
            "node": {
                "commit": {
                    "ancestors": {
                        "nodes": commits,
                        "pageInfo": { "hasNextPage": false }
                    }
                }
            }
        }
    })
}

/// A scratch repository with deterministic commit times.
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: git2::Repository,
    clock: i64,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        Self {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `files` (an empty body deletes the file) and commits on HEAD.
    pub fn commit(&mut self, files: &[(&str, &str)], message: &str) -> git2::Oid {
        let mut index = self.repo.index().unwrap();
        for (path, contents) in files {
            let full = self.dir.path().join(path);
            if contents.is_empty() {
                fs::remove_file(&full).unwrap();
                index.remove_path(Path::new(path)).unwrap();
            } else {
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&full, contents).unwrap();
                index.add_path(Path::new(path)).unwrap();
            }
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        self.clock += 60;
        let time = git2::Time::new(self.clock, 0);
        let signature = git2::Signature::new("Alice", "alice@example.com", &time).unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .map(|oid| self.repo.find_commit(oid).unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
    }

    pub fn tag(&self, name: &str, oid: git2::Oid) {
        let object = self.repo.find_object(oid, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }
}
