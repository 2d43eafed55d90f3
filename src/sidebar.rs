// src/sidebar.rs

use crate::commit_node::{GitCommitNodeOptions, commit_lines};
use crate::commits::{FetchArgs, fetch_commits};
use crate::connection::{
    ConnectionArgs, FilteredConnection, FilteredConnectionConfig, Link, Loaded, NodeComponent,
    QueryConnection, RenderedNode,
};
use crate::graphql::QueryBackend;
use crate::navigation::{Location, SharedHistory, replace_revision_in_url};
use crate::types::commit_info::CommitInfo;
use crate::types::repo_id::RepoId;
use chrono::Utc;
use crossterm::event::KeyEvent;
use futures::FutureExt;
use std::sync::Arc;
use tui::{Frame, backend::Backend, layout::Rect, style::{Color, Style}, text::Span};

pub const DEFAULT_FIRST: u32 = 100;

#[derive(Clone, Debug)]
pub struct SidebarProps {
    pub repo_id: RepoId,
    pub repo_name: String,
    pub rev: Option<String>,
    pub file_path: String,
}

pub struct CommitNodeProps {
    pub location: Location,
}

/// A compact commit row with a link to the current file at that commit.
pub struct CommitNode;

impl NodeComponent<CommitInfo> for CommitNode {
    type Props = CommitNodeProps;

    fn render(node: &CommitInfo, props: &CommitNodeProps) -> RenderedNode {
        let mut lines = commit_lines(
            node,
            GitCommitNodeOptions {
                compact: true,
                expand_body: false,
            },
            Utc::now(),
        );
        let link = Link {
            to: replace_revision_in_url(&props.location.href(), &node.oid),
            title: "View current file at this commit".to_string(),
        };
        if let Some(line) = lines.first_mut() {
            line.0.push(Span::styled(" [file]", Style::default().fg(Color::Cyan)));
        }
        RenderedNode {
            lines,
            link: Some(link),
        }
    }
}

/// History of one file at one revision, shown beside the file.
pub struct RevSidebarCommits {
    props: SidebarProps,
    connection: FilteredConnection<CommitInfo, CommitNode>,
}

impl RevSidebarCommits {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        props: SidebarProps,
        location: Location,
        history: SharedHistory,
    ) -> Self {
        let config = FilteredConnectionConfig {
            noun: "commit",
            plural_noun: "commits",
            compact: true,
            default_first: DEFAULT_FIRST,
            hide_search: true,
            should_update_url_query: false,
        };
        let node_props = CommitNodeProps { location };
        let connection = FilteredConnection::new(
            config,
            Self::query_connection(backend, &props),
            node_props,
            history,
        );
        Self { props, connection }
    }

    fn query_connection(
        backend: Arc<dyn QueryBackend>,
        props: &SidebarProps,
    ) -> QueryConnection<CommitInfo> {
        let repo_id = props.repo_id.clone();
        let rev = props.rev.clone().unwrap_or_default();
        let current_path = props.file_path.clone();
        Box::new(move |args: ConnectionArgs| {
            let args = FetchArgs {
                first: Some(args.first),
                current_path: Some(current_path.clone()),
                query: args.query,
            };
            fetch_commits(backend.clone(), &repo_id, &rev, args).boxed()
        })
    }

    pub fn props(&self) -> &SidebarProps {
        &self.props
    }

    pub fn mount(&mut self) {
        self.connection.mount();
    }

    pub fn load_more(&mut self) -> bool {
        self.connection.load_more()
    }

    /// Keeps row links pointing at the current location.
    pub fn set_location(&mut self, location: Location) {
        self.connection.set_props(CommitNodeProps { location });
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Link> {
        self.connection.handle_key(key)
    }

    pub async fn next_loaded(&mut self) -> Option<Loaded<CommitInfo>> {
        self.connection.next_loaded().await
    }

    pub fn apply(&mut self, loaded: Loaded<CommitInfo>) {
        self.connection.apply(loaded);
    }

    pub fn selected(&self) -> Option<&CommitInfo> {
        self.connection.selected()
    }

    pub fn commits(&self) -> &[CommitInfo] {
        self.connection.nodes()
    }

    pub fn rows(&self) -> Vec<RenderedNode> {
        self.connection.rows()
    }

    pub fn shows_search_box(&self) -> bool {
        self.connection.shows_search_box()
    }

    pub fn render<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect, is_active: bool) {
        let title = format!("History of {}", self.props.file_path);
        self.connection.render(f, area, &title, is_active);
    }
}
