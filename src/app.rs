// src/app.rs

use crate::config::Config;
use crate::git::{self, LocalBackend};
use crate::navigation::{History, Location, MemoryHistory, RepoRevRoute, SharedHistory, blob_url};
use crate::sidebar::{RevSidebarCommits, SidebarProps};
use crate::types::repo_id::RepoId;
use anyhow::{Context, Result, anyhow};
use crossterm::event::{KeyCode, KeyEvent};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

pub enum ActivePanel {
    Commits,
    File,
}

/// The file currently on screen.
pub struct FileView {
    pub title: String,
    pub lines: Vec<String>,
    /// From a `#L<n>` fragment, 1-based.
    pub highlighted_line: Option<usize>,
    pub scroll: u16,
}

pub struct App {
    pub should_quit: bool,
    pub active_panel: ActivePanel,
    backend: Arc<LocalBackend>,
    repo_id: RepoId,
    repo_name: String,
    repo_path: PathBuf,
    history: SharedHistory,
    pub sidebar: RevSidebarCommits,
    pub file: FileView,
    pub status: Option<String>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let repo_name = config.repo_name();
        git2::Repository::open(&config.repo)
            .with_context(|| format!("Couldn't open repository at {}", config.repo.display()))?;

        let mut backend = LocalBackend::new();
        let repo_id = backend.register(&repo_name, &config.repo);
        let backend = Arc::new(backend);

        let href = blob_url(&repo_name, config.rev.as_deref(), &config.path);
        info!("opening {href}");
        let history = MemoryHistory::shared(&href);
        let location = history.borrow().location().clone();
        let route = RepoRevRoute::parse(&location.pathname)
            .ok_or_else(|| anyhow!("{href} is not a repository location"))?;

        let sidebar = Self::build_sidebar(
            backend.clone(),
            &repo_id,
            &repo_name,
            &route,
            location,
            history.clone(),
        );
        let mut app = Self {
            should_quit: false,
            active_panel: ActivePanel::Commits,
            backend,
            repo_id,
            repo_name,
            repo_path: config.repo.clone(),
            history,
            sidebar,
            file: FileView {
                title: String::new(),
                lines: Vec::new(),
                highlighted_line: None,
                scroll: 0,
            },
            status: None,
        };
        app.load_file();
        Ok(app)
    }

    fn build_sidebar(
        backend: Arc<LocalBackend>,
        repo_id: &RepoId,
        repo_name: &str,
        route: &RepoRevRoute,
        location: Location,
        history: SharedHistory,
    ) -> RevSidebarCommits {
        let props = SidebarProps {
            repo_id: repo_id.clone(),
            repo_name: repo_name.to_string(),
            rev: route.rev.clone(),
            file_path: route.file_path.clone().unwrap_or_default(),
        };
        let mut sidebar = RevSidebarCommits::new(backend, props, location, history);
        sidebar.mount();
        sidebar
    }

    pub fn location(&self) -> Location {
        self.history.borrow().location().clone()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => {
                self.active_panel = match self.active_panel {
                    ActivePanel::Commits => ActivePanel::File,
                    ActivePanel::File => ActivePanel::Commits,
                };
            }
            KeyCode::Char('b') | KeyCode::Backspace => self.go_back(),
            _ => match self.active_panel {
                ActivePanel::Commits => {
                    if let Some(link) = self.sidebar.handle_key(key) {
                        self.navigate(&link.to);
                    }
                }
                ActivePanel::File => self.scroll_file(key),
            },
        }
    }

    fn scroll_file(&mut self, key: KeyEvent) {
        let max = u16::try_from(self.file.lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
        self.file.scroll = match key.code {
            KeyCode::Down => self.file.scroll.saturating_add(1),
            KeyCode::Up => self.file.scroll.saturating_sub(1),
            KeyCode::PageDown => self.file.scroll.saturating_add(20),
            KeyCode::PageUp => self.file.scroll.saturating_sub(20),
            KeyCode::Home => 0,
            _ => return,
        }
        .min(max);
    }

    pub fn navigate(&mut self, href: &str) {
        info!("navigating to {href}");
        self.history.borrow_mut().push(href);
        self.sync_with_location();
    }

    fn go_back(&mut self) {
        let moved = self.history.borrow_mut().go_back();
        if moved {
            self.sync_with_location();
        } else {
            self.status = Some("Already at the first location".to_string());
        }
    }

    /// Brings the sidebar and file panel in line with the history's location.
    fn sync_with_location(&mut self) {
        let location = self.location();
        let Some(route) = RepoRevRoute::parse(&location.pathname) else {
            warn!("{} is not a repository location", location.href());
            self.status = Some(format!("Cannot open {}", location.href()));
            return;
        };
        let props = self.sidebar.props();
        let file_path = route.file_path.clone().unwrap_or_default();
        if props.rev != route.rev || props.file_path != file_path {
            self.sidebar = Self::build_sidebar(
                self.backend.clone(),
                &self.repo_id,
                &self.repo_name,
                &route,
                location,
                self.history.clone(),
            );
        } else {
            self.sidebar.set_location(location);
        }
        self.status = None;
        self.load_file();
    }

    fn load_file(&mut self) {
        let location = self.location();
        let Some(route) = RepoRevRoute::parse(&location.pathname) else {
            return;
        };
        let rev = route.rev.clone().unwrap_or_default();
        let path = route.file_path.clone().unwrap_or_default();
        let shown_rev = if rev.is_empty() { "HEAD" } else { rev.as_str() };
        self.file.title = format!("{}@{shown_rev}: {path}", self.repo_name);
        self.file.lines = match git::file_content_at(&self.repo_path, &rev, &path) {
            Ok(Some(content)) => content.lines().map(str::to_string).collect(),
            Ok(None) => vec![format!("{path} does not exist at {shown_rev}")],
            Err(e) => {
                warn!("could not read {path} at {shown_rev}: {e}");
                vec![format!("Could not load file: {e}")]
            }
        };
        self.file.highlighted_line = location
            .hash
            .strip_prefix("#L")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0);
        self.file.scroll = self
            .file
            .highlighted_line
            .map_or(0, |n| u16::try_from(n - 1).unwrap_or(u16::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use clap::Parser;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fixture() -> (TestRepo, Vec<git2::Oid>) {
        let mut repo = TestRepo::new();
        let oids = vec![
            repo.commit(&[("notes.txt", "one\n")], "Start notes"),
            repo.commit(&[("other.txt", "x\n")], "Unrelated"),
            repo.commit(&[("notes.txt", "one\ntwo\n")], "Extend notes"),
        ];
        (repo, oids)
    }

    fn app(repo: &TestRepo) -> App {
        let config = Config::parse_from([
            "rev-sidebar",
            "--repo",
            repo.path().to_str().unwrap(),
            "--name",
            "notes",
            "notes.txt",
        ]);
        App::new(&config).unwrap()
    }

    async fn settle(app: &mut App) {
        let loaded = app.sidebar.next_loaded().await.unwrap();
        app.sidebar.apply(loaded);
    }

    #[tokio::test]
    async fn opens_file_with_its_history() {
        let (repo, _) = fixture();
        let mut app = app(&repo);
        settle(&mut app).await;

        assert_eq!(app.location().href(), "/notes/-/blob/notes.txt");
        assert_eq!(app.file.lines, vec!["one", "two"]);
        let subjects: Vec<_> = app.sidebar.commits().iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Extend notes", "Start notes"]);
    }

    #[tokio::test]
    async fn following_a_row_opens_the_file_at_that_commit() {
        let (repo, oids) = fixture();
        let mut app = app(&repo);
        settle(&mut app).await;

        app.handle_key_event(key(KeyCode::Down));
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(
            app.location().href(),
            format!("/notes@{}/-/blob/notes.txt", oids[0])
        );
        assert_eq!(app.file.lines, vec!["one"]);

        settle(&mut app).await;
        let subjects: Vec<_> = app.sidebar.commits().iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Start notes"]);

        app.handle_key_event(key(KeyCode::Char('b')));
        assert_eq!(app.location().href(), "/notes/-/blob/notes.txt");
        assert_eq!(app.file.lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn line_fragment_highlights_and_scrolls() {
        let (repo, _) = fixture();
        let mut app = app(&repo);
        app.navigate("/notes/-/blob/notes.txt#L2");
        assert_eq!(app.file.highlighted_line, Some(2));
        assert_eq!(app.file.scroll, 1);
        assert!(app.status.is_none());
    }

    #[tokio::test]
    async fn file_names_with_url_characters_keep_their_history() {
        let mut repo = TestRepo::new();
        repo.commit(&[("docs/C", "plain\n")], "Add C");
        repo.commit(&[("docs/C#.md", "sharp\n")], "Add C#");
        repo.commit(&[("docs/C#.md", "sharper\n")], "Edit C#");
        let config = Config::parse_from([
            "rev-sidebar",
            "--repo",
            repo.path().to_str().unwrap(),
            "--name",
            "pkg@1.2",
            "docs/C#.md",
        ]);
        let mut app = App::new(&config).unwrap();
        settle(&mut app).await;

        assert_eq!(app.location().href(), "/pkg%401.2/-/blob/docs/C%23.md");
        assert_eq!(app.location().hash, "");
        assert_eq!(app.sidebar.props().file_path, "docs/C#.md");
        assert_eq!(app.file.lines, vec!["sharper"]);
        let subjects: Vec<_> = app.sidebar.commits().iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Edit C#", "Add C#"]);
    }

    #[tokio::test]
    async fn line_fragment_past_u16_range_scrolls_to_the_end() {
        let (repo, _) = fixture();
        let mut app = app(&repo);
        app.navigate("/notes/-/blob/notes.txt#L70000");
        assert_eq!(app.file.highlighted_line, Some(70000));
        assert_eq!(app.file.scroll, u16::MAX);
    }

    #[tokio::test]
    async fn missing_repository_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::parse_from(["rev-sidebar", "--repo", dir.path().to_str().unwrap(), "a"]);
        assert!(App::new(&config).is_err());
    }

    #[tokio::test]
    async fn quit_and_back_at_start() {
        let (repo, _) = fixture();
        let mut app = app(&repo);
        app.handle_key_event(key(KeyCode::Backspace));
        assert_eq!(app.status.as_deref(), Some("Already at the first location"));
        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
