// src/connection.rs

use crate::error::QueryError;
use crate::navigation::{SharedHistory, query_param, with_query_params};
use crate::types::connection::Connection;
use crossterm::event::{Event, KeyCode, KeyEvent};
use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

/// Paging and filter arguments handed to the query function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionArgs {
    pub first: u32,
    pub query: Option<String>,
}

pub type QueryConnection<N> =
    Box<dyn Fn(ConnectionArgs) -> BoxFuture<'static, Result<Connection<N>, QueryError>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub to: String,
    pub title: String,
}

pub struct RenderedNode {
    pub lines: Vec<Spans<'static>>,
    pub link: Option<Link>,
}

/// Renders one node of a connection, given props shared by every row.
pub trait NodeComponent<N> {
    type Props;

    fn render(node: &N, props: &Self::Props) -> RenderedNode;
}

#[derive(Clone, Debug)]
pub struct FilteredConnectionConfig {
    pub noun: &'static str,
    pub plural_noun: &'static str,
    pub compact: bool,
    pub default_first: u32,
    pub hide_search: bool,
    /// Mirror `first`/`query` into the location's query string.
    pub should_update_url_query: bool,
}

impl Default for FilteredConnectionConfig {
    fn default() -> Self {
        Self {
            noun: "item",
            plural_noun: "items",
            compact: false,
            default_first: 20,
            hide_search: false,
            should_update_url_query: true,
        }
    }
}

/// A finished query, tagged with the request it answers.
pub struct Loaded<N> {
    seq: u64,
    args: ConnectionArgs,
    result: Result<Connection<N>, QueryError>,
}

/// A list backed by a paginated query, with optional search box.
///
/// Every page or query change starts a new request. A request supersedes (and
/// aborts) the one before it, and responses that do not answer the latest
/// request are dropped, so the list always shows the newest result.
pub struct FilteredConnection<N, C: NodeComponent<N>> {
    config: FilteredConnectionConfig,
    query_connection: QueryConnection<N>,
    props: C::Props,
    history: SharedHistory,
    first: u32,
    query: Input,
    search_focused: bool,
    connection: Option<Connection<N>>,
    error: Option<QueryError>,
    loading: bool,
    seq: u64,
    in_flight: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<Loaded<N>>,
    receiver: mpsc::UnboundedReceiver<Loaded<N>>,
    list_state: ListState,
}

impl<N: Send + 'static, C: NodeComponent<N>> FilteredConnection<N, C> {
    pub fn new(
        config: FilteredConnectionConfig,
        query_connection: QueryConnection<N>,
        props: C::Props,
        history: SharedHistory,
    ) -> Self {
        let (mut first, mut query) = (config.default_first, String::new());
        if config.should_update_url_query {
            let current = history.borrow();
            let search = &current.location().search;
            if let Some(n) = query_param(search, "first")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
            {
                first = n;
            }
            query = query_param(search, "query").unwrap_or_default();
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            query_connection,
            props,
            history,
            first,
            query: Input::new(query),
            search_focused: false,
            connection: None,
            error: None,
            loading: false,
            seq: 0,
            in_flight: None,
            sender,
            receiver,
            list_state: ListState::default(),
        }
    }

    pub fn mount(&mut self) {
        self.request();
    }

    /// Asks for a larger page. Returns false when there is nothing more.
    pub fn load_more(&mut self) -> bool {
        let has_more = self
            .connection
            .as_ref()
            .is_some_and(|c| c.has_next_page(self.first));
        if has_more {
            self.first = self.first.saturating_mul(2).max(1);
            self.request();
        }
        has_more
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = Input::new(query.to_string());
        self.first = self.config.default_first;
        self.request();
    }

    pub fn set_props(&mut self, props: C::Props) {
        self.props = props;
    }

    fn args(&self) -> ConnectionArgs {
        let query = self.query.value();
        ConnectionArgs {
            first: self.first,
            query: (!query.is_empty()).then(|| query.to_string()),
        }
    }

    fn request(&mut self) {
        self.seq += 1;
        if let Some(handle) = self.in_flight.take() {
            debug!("request #{} supersedes an unfinished one", self.seq);
            handle.abort();
        }
        let args = self.args();
        let future = (self.query_connection)(args.clone());
        let sender = self.sender.clone();
        let seq = self.seq;
        self.loading = true;
        self.in_flight = Some(tokio::spawn(async move {
            let result = future.await;
            let _ = sender.send(Loaded { seq, args, result });
        }));
    }

    /// Waits for the next finished request; feed it to [`Self::apply`].
    pub async fn next_loaded(&mut self) -> Option<Loaded<N>> {
        self.receiver.recv().await
    }

    pub fn apply(&mut self, loaded: Loaded<N>) {
        if loaded.seq != self.seq {
            debug!(
                "dropping stale {} response #{} (latest is #{})",
                self.config.noun, loaded.seq, self.seq
            );
            return;
        }
        self.in_flight = None;
        self.loading = false;
        match loaded.result {
            Ok(connection) => {
                let len = connection.nodes.len();
                self.list_state.select(match self.list_state.selected() {
                    _ if len == 0 => None,
                    Some(i) => Some(i.min(len - 1)),
                    None => Some(0),
                });
                self.connection = Some(connection);
                self.error = None;
                if self.config.should_update_url_query {
                    self.update_url_query(&loaded.args);
                }
            }
            Err(e) => {
                warn!("could not load {}: {e}", self.config.plural_noun);
                self.connection = None;
                self.list_state.select(None);
                self.error = Some(e);
            }
        }
    }

    fn update_url_query(&self, args: &ConnectionArgs) {
        let mut history = self.history.borrow_mut();
        let location = history.location().clone();
        let first = (args.first != self.config.default_first).then(|| args.first.to_string());
        let search = with_query_params(
            &location.search,
            &[("first", first), ("query", args.query.clone())],
        );
        let href = format!("{}{search}{}", location.pathname, location.hash);
        if href != location.href() {
            history.replace(&href);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Link> {
        if self.search_focused {
            match key.code {
                KeyCode::Enter => {
                    self.search_focused = false;
                    let query = self.query.value().to_string();
                    self.set_query(&query);
                }
                KeyCode::Esc => self.search_focused = false,
                _ => {
                    self.query.handle_event(&Event::Key(key));
                }
            }
            return None;
        }
        match key.code {
            KeyCode::Down => self.select_next(),
            KeyCode::Up => self.select_previous(),
            KeyCode::Char('m') => {
                self.load_more();
            }
            KeyCode::Char('/') if !self.config.hide_search => self.search_focused = true,
            KeyCode::Enter => return self.selected_link(),
            _ => {}
        }
        None
    }

    fn select_next(&mut self) {
        let len = self.nodes().len();
        if len == 0 {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| if i >= len - 1 { 0 } else { i + 1 });
        self.list_state.select(Some(i));
    }

    fn select_previous(&mut self) {
        let len = self.nodes().len();
        if len == 0 {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
        self.list_state.select(Some(i));
    }

    pub fn nodes(&self) -> &[N] {
        self.connection
            .as_ref()
            .map(|c| c.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected(&self) -> Option<&N> {
        self.list_state.selected().and_then(|i| self.nodes().get(i))
    }

    pub fn selected_link(&self) -> Option<Link> {
        self.selected().and_then(|node| C::render(node, &self.props).link)
    }

    pub fn rows(&self) -> Vec<RenderedNode> {
        self.nodes()
            .iter()
            .map(|node| C::render(node, &self.props))
            .collect()
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn shows_search_box(&self) -> bool {
        !self.config.hide_search
    }

    pub fn summary(&self) -> String {
        if let Some(e) = &self.error {
            return format!("Error: {e}");
        }
        let Some(connection) = &self.connection else {
            return format!("Loading {}...", self.config.plural_noun);
        };
        let count = connection.nodes.len();
        let noun = if count == 1 {
            self.config.noun
        } else {
            self.config.plural_noun
        };
        let mut summary = match connection.total_count {
            _ if count == 0 => format!("No {}", self.config.plural_noun),
            Some(total) => format!("{count} of {total} {noun}"),
            None => format!("{count} {noun}"),
        };
        if self.loading {
            summary.push_str(", loading...");
        } else if connection.has_next_page(self.first) {
            summary.push_str(" (m: show more)");
        }
        summary
    }

    pub fn render<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect, title: &str, is_active: bool) {
        let area = if self.config.hide_search {
            area
        } else {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(area);
            self.render_search(f, chunks[0]);
            chunks[1]
        };

        let border_style = if is_active {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let summary = self.summary();
        let (block, footer) = if self.config.compact {
            (
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{title} ({summary})"))
                    .border_style(border_style),
                None,
            )
        } else {
            (
                Block::default()
                    .borders(Borders::ALL)
                    .title(title.to_string())
                    .border_style(border_style),
                Some(summary),
            )
        };

        if let Some(e) = &self.error {
            let text = Paragraph::new(e.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(text, area);
            return;
        }

        let inner = block.inner(area);
        f.render_widget(block, area);
        let (list_area, footer_area) = match footer {
            Some(_) => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(1)])
                    .split(inner);
                (chunks[0], Some(chunks[1]))
            }
            None => (inner, None),
        };

        let items: Vec<ListItem> = self
            .rows()
            .into_iter()
            .map(|row| ListItem::new(row.lines))
            .collect();
        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .bg(if is_active { Color::LightBlue } else { Color::DarkGray })
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, list_area, &mut self.list_state);

        if let (Some(text), Some(area)) = (footer, footer_area) {
            f.render_widget(
                Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
                area,
            );
        }
    }

    fn render_search<B: Backend>(&self, f: &mut Frame<B>, area: Rect) {
        let style = if self.search_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let input = Paragraph::new(self.query.value().to_string()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Search {}...", self.config.plural_noun))
                .border_style(style),
        );
        f.render_widget(input, area);
        if self.search_focused {
            let cursor = u16::try_from(self.query.visual_cursor()).unwrap_or(u16::MAX);
            let max_x = (area.x + area.width).saturating_sub(2);
            f.set_cursor((area.x + 1).saturating_add(cursor).min(max_x), area.y + 1);
        }
    }
}

impl<N, C: NodeComponent<N>> Drop for FilteredConnection<N, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
