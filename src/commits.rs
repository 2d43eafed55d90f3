// src/commits.rs

use crate::error::{QueryError, Result};
use crate::graphql::{GraphQLRequest, GraphQLResult, QueryBackend, data_or_throw_errors, gql, query_graphql};
use crate::types::connection::CommitConnection;
use crate::types::repo_id::RepoId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

pub const FETCH_COMMITS: &str = "FetchCommits";

const GIT_COMMIT_FIELDS: &str = r#"
    fragment GitCommitFields on GitCommit {
        id
        oid
        abbreviatedOID
        subject
        body
        author { person { name email } date }
        committer { person { name email } date }
        parents { oid abbreviatedOID }
    }
"#;

const FETCH_COMMITS_QUERY: &str = r#"
    query FetchCommits($repo: ID!, $rev: String!, $first: Int, $currentPath: String, $query: String) {
        node(id: $repo) {
            ... on Repository {
                commit(rev: $rev) {
                    ancestors(first: $first, query: $query, path: $currentPath) {
                        nodes {
                            ...GitCommitFields
                        }
                        pageInfo {
                            hasNextPage
                        }
                    }
                }
            }
        }
    }
"#;

/// Paging and filtering for one fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchArgs {
    pub first: Option<u32>,
    pub current_path: Option<String>,
    pub query: Option<String>,
}

/// Variables of the `FetchCommits` operation as they travel on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchCommitsVariables {
    pub repo: RepoId,
    pub rev: String,
    pub first: Option<u32>,
    #[serde(default)]
    pub current_path: String,
    #[serde(default)]
    pub query: String,
}

impl FetchCommitsVariables {
    pub fn new(repo: &RepoId, rev: &str, args: FetchArgs) -> Self {
        Self {
            repo: repo.clone(),
            rev: rev.to_string(),
            first: args.first,
            current_path: args.current_path.unwrap_or_default(),
            query: args.query.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct FetchCommitsData {
    node: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    #[serde(default)]
    commit: Option<CommitAncestors>,
}

#[derive(Deserialize)]
struct CommitAncestors {
    ancestors: CommitConnection,
}

/// Fetches the ancestors of `rev` in repository `repo`.
///
/// The returned future issues exactly one `FetchCommits` query when polled and
/// yields the connection exactly as the backend ordered it. It can be dropped
/// (or its task aborted) at any point to cancel.
pub fn fetch_commits(
    backend: Arc<dyn QueryBackend>,
    repo: &RepoId,
    rev: &str,
    args: FetchArgs,
) -> impl Future<Output = Result<CommitConnection>> + Send + use<> {
    let variables = FetchCommitsVariables::new(repo, rev, args);
    let request = serde_json::to_value(&variables).map(|variables| {
        gql(&format!("{FETCH_COMMITS_QUERY}{GIT_COMMIT_FIELDS}"), variables)
    });
    run_fetch_commits(backend, request)
}

async fn run_fetch_commits(
    backend: Arc<dyn QueryBackend>,
    request: serde_json::Result<GraphQLRequest>,
) -> Result<CommitConnection> {
    let GraphQLResult { data, errors } =
        query_graphql::<FetchCommitsData>(backend, request?).await?;

    // A present `data` whose repository or commit is missing means the backend
    // broke its contract, whether or not it also reported errors.
    let commit = match data {
        None => None,
        Some(FetchCommitsData { node }) => match node.and_then(|node| node.commit) {
            Some(commit) => Some(commit),
            None => return Err(QueryError::invalid_response(FETCH_COMMITS, errors)),
        },
    };
    let commit = data_or_throw_errors(GraphQLResult {
        data: commit,
        errors,
    })?;
    Ok(commit.ancestors)
}
