// src/git.rs

use crate::commits::{FETCH_COMMITS, FetchCommitsVariables};
use crate::error::Result;
use crate::graphql::{GraphQLError, GraphQLRequest, QueryBackend};
use crate::types::commit_info::{CommitInfo, ParentInfo, Person, Signature, abbreviate_oid};
use crate::types::connection::{CommitConnection, Connection, PageInfo};
use crate::types::repo_id::RepoId;
use chrono::{DateTime, SecondsFormat};
use git2::{Commit, ErrorCode, Oid, Repository, Sort, Tree};
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

struct RegisteredRepo {
    id: RepoId,
    path: PathBuf,
}

/// Serves the browser's queries from repositories on the local disk.
#[derive(Default)]
pub struct LocalBackend {
    repositories: Vec<RegisteredRepo>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, path: impl Into<PathBuf>) -> RepoId {
        let id = RepoId::new(format!("Repository:{}", self.repositories.len() + 1));
        let path: PathBuf = path.into();
        info!("registered {name} at {} as {id}", path.display());
        self.repositories.push(RegisteredRepo {
            id: id.clone(),
            path,
        });
        id
    }

    pub fn path_of(&self, id: &RepoId) -> Option<&Path> {
        self.repositories
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.path.as_path())
    }

    fn fetch_commits(&self, variables: &FetchCommitsVariables) -> Value {
        let Some(path) = self.path_of(&variables.repo) else {
            debug!("no repository registered as {}", variables.repo);
            return json!({ "data": { "node": null } });
        };
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(e) => {
                warn!("could not open {}: {e}", path.display());
                return field_error(json!({ "node": null }), e.message(), &["node"]);
            }
        };

        let rev = if variables.rev.is_empty() {
            "HEAD"
        } else {
            variables.rev.as_str()
        };
        let start = match repo.revparse_single(rev).and_then(|o| o.peel_to_commit()) {
            Ok(commit) => commit.id(),
            Err(e) => {
                debug!("revision {rev:?} does not resolve: {e}");
                return json!({ "data": { "node": { "commit": null } } });
            }
        };

        let filter = AncestorFilter {
            first: variables.first.map(|f| f as usize),
            path: &variables.current_path,
            query: variables.query.to_lowercase(),
        };
        match walk_ancestors(&repo, start, &filter) {
            Ok(ancestors) => json!({ "data": { "node": { "commit": { "ancestors": ancestors } } } }),
            Err(e) => field_error(
                json!({ "node": { "commit": null } }),
                e.message(),
                &["node", "commit", "ancestors"],
            ),
        }
    }
}

impl QueryBackend for LocalBackend {
    fn execute(&self, request: &GraphQLRequest) -> Result<Value> {
        match request.operation_name.as_str() {
            FETCH_COMMITS => {
                match serde_json::from_value::<FetchCommitsVariables>(request.variables.clone()) {
                    Ok(variables) => Ok(self.fetch_commits(&variables)),
                    Err(e) => Ok(field_error(Value::Null, &format!("invalid variables: {e}"), &[])),
                }
            }
            other => Ok(field_error(
                Value::Null,
                &format!("unknown operation {other:?}"),
                &[],
            )),
        }
    }
}

fn field_error(data: Value, message: &str, path: &[&str]) -> Value {
    let mut error = GraphQLError::new(message);
    error.path = path.iter().map(|p| json!(p)).collect();
    json!({ "data": data, "errors": [error] })
}

struct AncestorFilter<'a> {
    first: Option<usize>,
    path: &'a str,
    /// Lowercased; empty matches everything.
    query: String,
}

fn walk_ancestors(
    repo: &Repository,
    start: Oid,
    filter: &AncestorFilter,
) -> std::result::Result<CommitConnection, git2::Error> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(start)?;

    let mut nodes = Vec::new();
    let mut has_next_page = false;
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        if !filter.query.is_empty()
            && !commit
                .message()
                .unwrap_or("")
                .to_lowercase()
                .contains(&filter.query)
        {
            continue;
        }
        if !filter.path.is_empty() && !touches_path(&commit, Path::new(filter.path))? {
            continue;
        }
        if filter.first.is_some_and(|first| nodes.len() >= first) {
            has_next_page = true;
            break;
        }
        nodes.push(commit_info(&commit));
    }

    let mut connection = Connection::new(nodes);
    connection.page_info = Some(PageInfo { has_next_page });
    Ok(connection)
}

/// A commit touches `path` when its entry there differs from every parent's.
fn touches_path(commit: &Commit, path: &Path) -> std::result::Result<bool, git2::Error> {
    let entry = entry_id(&commit.tree()?, path)?;
    if commit.parent_count() == 0 {
        return Ok(entry.is_some());
    }
    for parent in commit.parents() {
        if entry_id(&parent.tree()?, path)? == entry {
            return Ok(false);
        }
    }
    Ok(true)
}

fn entry_id(tree: &Tree, path: &Path) -> std::result::Result<Option<Oid>, git2::Error> {
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn commit_info(commit: &Commit) -> CommitInfo {
    let oid = commit.id().to_string();
    CommitInfo {
        id: format!("GitCommit:{oid}"),
        abbreviated_oid: abbreviate(&oid),
        subject: commit.summary().unwrap_or("").to_string(),
        body: commit
            .body()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string),
        author: signature(&commit.author()),
        committer: Some(signature(&commit.committer())),
        parents: commit
            .parent_ids()
            .map(|id| {
                let oid = id.to_string();
                ParentInfo {
                    abbreviated_oid: abbreviate(&oid),
                    oid,
                }
            })
            .collect(),
        oid,
    }
}

fn abbreviate(oid: &str) -> String {
    abbreviate_oid(oid).to_string()
}

fn signature(sig: &git2::Signature) -> Signature {
    let date = DateTime::from_timestamp(sig.when().seconds(), 0)
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();
    Signature {
        person: Person {
            name: sig.name().unwrap_or("Unknown").to_string(),
            email: sig.email().unwrap_or("").to_string(),
        },
        date,
    }
}

/// Reads `file_path` as it was at `rev`; `None` when either does not exist.
pub fn file_content_at(
    repo_path: &Path,
    rev: &str,
    file_path: &str,
) -> std::result::Result<Option<String>, git2::Error> {
    let repo = Repository::open(repo_path)?;
    let rev = if rev.is_empty() { "HEAD" } else { rev };
    let commit = match repo.revparse_single(rev).and_then(|o| o.peel_to_commit()) {
        Ok(commit) => commit,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let tree = commit.tree()?;
    let entry = match tree.get_path(Path::new(file_path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let blob = entry.to_object(&repo)?.peel_to_blob()?;
    Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commits::{FetchArgs, fetch_commits};
    use crate::error::QueryError;
    use crate::graphql::gql;
    use crate::test_support::TestRepo;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn fixture() -> (TestRepo, Vec<Oid>) {
        let mut repo = TestRepo::new();
        let oids = vec![
            repo.commit(&[("README.md", "hello\n")], "Add readme"),
            repo.commit(&[("src/lib.rs", "fn a() {}\n")], "Add library"),
            repo.commit(&[("README.md", "hello world\n")], "Fix typo in README"),
            repo.commit(&[("src/lib.rs", "fn b() {}\n")], "Rename a to b\n\nLonger body."),
            repo.commit(&[("README.md", "")], "Remove readme"),
        ];
        (repo, oids)
    }

    fn query(backend: &LocalBackend, variables: Value) -> Value {
        backend
            .execute(&gql("query FetchCommits { node }", variables))
            .unwrap()
    }

    fn subjects(response: &Value) -> Vec<String> {
        response["data"]["node"]["commit"]["ancestors"]["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["subject"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn empty_revision_walks_from_head_newest_first() {
        let (repo, oids) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());

        let response = query(&backend, json!({ "repo": id, "rev": "" }));
        assert_eq!(
            subjects(&response),
            vec![
                "Remove readme",
                "Rename a to b",
                "Fix typo in README",
                "Add library",
                "Add readme"
            ]
        );
        let head = &response["data"]["node"]["commit"]["ancestors"]["nodes"][0];
        assert_eq!(head["oid"], json!(oids[4].to_string()));
        assert_eq!(head["parents"][0]["oid"], json!(oids[3].to_string()));
        assert_eq!(head["author"]["person"]["name"], json!("Alice"));
    }

    #[test]
    fn path_limits_history_to_commits_touching_it() {
        let (repo, _) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());

        let response = query(
            &backend,
            json!({ "repo": id, "rev": "HEAD", "currentPath": "README.md" }),
        );
        assert_eq!(
            subjects(&response),
            vec!["Remove readme", "Fix typo in README", "Add readme"]
        );
    }

    #[test]
    fn query_matches_messages_case_insensitively() {
        let (repo, _) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());

        let response = query(&backend, json!({ "repo": id, "rev": "", "query": "readme" }));
        assert_eq!(
            subjects(&response),
            vec!["Remove readme", "Fix typo in README", "Add readme"]
        );
        let response = query(&backend, json!({ "repo": id, "rev": "", "query": "LONGER BODY" }));
        assert_eq!(subjects(&response), vec!["Rename a to b"]);
    }

    #[test]
    fn first_limits_and_reports_next_page() {
        let (repo, _) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());

        let response = query(&backend, json!({ "repo": id, "rev": "", "first": 2 }));
        assert_eq!(subjects(&response), vec!["Remove readme", "Rename a to b"]);
        assert_eq!(
            response["data"]["node"]["commit"]["ancestors"]["pageInfo"]["hasNextPage"],
            json!(true)
        );

        let response = query(&backend, json!({ "repo": id, "rev": "", "first": 5 }));
        assert_eq!(subjects(&response).len(), 5);
        assert_eq!(
            response["data"]["node"]["commit"]["ancestors"]["pageInfo"]["hasNextPage"],
            json!(false)
        );
    }

    #[test]
    fn revision_may_be_a_tag_or_hash() {
        let (repo, oids) = fixture();
        repo.tag("v1", oids[1]);
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());

        let response = query(&backend, json!({ "repo": id, "rev": "v1" }));
        assert_eq!(subjects(&response), vec!["Add library", "Add readme"]);
        let response = query(&backend, json!({ "repo": id, "rev": oids[2].to_string() }));
        assert_eq!(subjects(&response).len(), 3);
    }

    #[test]
    fn unknown_repository_yields_null_node() {
        let backend = LocalBackend::new();
        let response = query(&backend, json!({ "repo": "Repository:9", "rev": "" }));
        assert_eq!(response, json!({ "data": { "node": null } }));
    }

    #[test]
    fn unknown_revision_yields_null_commit() {
        let (repo, _) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());
        let response = query(&backend, json!({ "repo": id, "rev": "no-such-branch" }));
        assert_eq!(response, json!({ "data": { "node": { "commit": null } } }));
    }

    #[test]
    fn unknown_operation_is_a_query_error() {
        let backend = LocalBackend::new();
        let response = backend
            .execute(&gql("query Other { x }", json!({})))
            .unwrap();
        assert_eq!(response["data"], Value::Null);
        assert_eq!(
            response["errors"][0]["message"],
            json!("unknown operation \"Other\"")
        );
    }

    #[tokio::test]
    async fn fetcher_reads_file_history_from_local_backend() {
        let (repo, _) = fixture();
        let mut backend = LocalBackend::new();
        let id = backend.register("repo", repo.path());
        let backend: Arc<dyn QueryBackend> = Arc::new(backend);

        let args = FetchArgs {
            first: Some(100),
            current_path: Some("src/lib.rs".to_string()),
            query: None,
        };
        let connection = fetch_commits(backend.clone(), &id, "", args).await.unwrap();
        let subjects: Vec<_> = connection.nodes.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Rename a to b", "Add library"]);
        assert_eq!(connection.nodes[0].body.as_deref(), Some("Longer body."));

        let err = fetch_commits(backend, &id, "nope", FetchArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidResponse { .. }));
    }

    #[test]
    fn file_content_follows_revision() {
        let (repo, oids) = fixture();
        assert_eq!(
            file_content_at(repo.path(), &oids[0].to_string(), "README.md").unwrap(),
            Some("hello\n".to_string())
        );
        assert_eq!(
            file_content_at(repo.path(), &oids[3].to_string(), "README.md").unwrap(),
            Some("hello world\n".to_string())
        );
        assert_eq!(file_content_at(repo.path(), "", "README.md").unwrap(), None);
        assert_eq!(file_content_at(repo.path(), "missing", "README.md").unwrap(), None);
    }
}
