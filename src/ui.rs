// src/ui.rs

use crate::app::{ActivePanel, App};
use crate::commit_node::{GitCommitNodeOptions, commit_lines};
use chrono::Utc;
use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn draw<B: Backend>(f: &mut Frame<B>, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.size());

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(top_chunks[1]);

    let commits_active = matches!(app.active_panel, ActivePanel::Commits);
    app.sidebar.render(f, top_chunks[0], commits_active);
    draw_file_panel(f, app, right_chunks[0]);
    draw_commit_panel(f, app, right_chunks[1]);
    draw_help(f, app, main_chunks[1]);
}

fn border_style(is_active: bool) -> Style {
    if is_active {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_file_panel<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let is_active = matches!(app.active_panel, ActivePanel::File);
    let width = app.file.lines.len().to_string().len();
    let lines: Vec<Spans> = app
        .file
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let number = i + 1;
            let style = if app.file.highlighted_line == Some(number) {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Spans::from(vec![
                Span::styled(
                    format!("{number:>width$} "),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(line.as_str(), style),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.file.title.as_str())
                .border_style(border_style(is_active)),
        )
        .scroll((app.file.scroll, 0));
    f.render_widget(paragraph, area);
}

fn draw_commit_panel<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let lines = match app.sidebar.selected() {
        Some(commit) => commit_lines(
            commit,
            GitCommitNodeOptions {
                compact: false,
                expand_body: true,
            },
            Utc::now(),
        ),
        None => vec![Spans::from("No commit selected")],
    };
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Commit"));
    f.render_widget(paragraph, area);
}

fn draw_help<B: Backend>(f: &mut Frame<B>, app: &App, area: Rect) {
    let help_text = match (&app.status, &app.active_panel) {
        (Some(status), _) => Text::styled(status.clone(), Style::default().add_modifier(Modifier::BOLD)),
        (None, ActivePanel::Commits) => Text::from(
            "↓↑: Navigate | <Enter>: View file at commit | m: More | b: Back | <Tab>: Switch | q: Quit",
        ),
        (None, ActivePanel::File) => {
            Text::from("↓↑/PgUp/PgDn: Scroll | b: Back | <Tab>: Switch | q: Quit")
        }
    };
    let help =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}
