// src/commit_node.rs

use crate::types::commit_info::CommitInfo;
use chrono::{DateTime, Utc};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};

#[derive(Clone, Copy, Debug, Default)]
pub struct GitCommitNodeOptions {
    /// One line per commit.
    pub compact: bool,
    /// Show the message body below the subject (ignored when compact).
    pub expand_body: bool,
}

pub fn commit_lines(
    node: &CommitInfo,
    options: GitCommitNodeOptions,
    now: DateTime<Utc>,
) -> Vec<Spans<'static>> {
    let when = relative_date(&node.author.date, now);
    if options.compact {
        return vec![Spans::from(vec![
            Span::styled(node.short_oid().to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::raw(node.subject.clone()),
            Span::styled(
                format!(" · {}, {when}", node.author.person.name),
                Style::default().fg(Color::DarkGray),
            ),
        ])];
    }

    let mut lines = vec![
        Spans::from(Span::styled(
            node.subject.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Spans::from(format!(
            "{} <{}> authored {when}",
            node.author.person.name, node.author.person.email
        )),
    ];
    if let Some(committer) = &node.committer {
        if committer.person != node.author.person {
            lines.push(Spans::from(format!(
                "{} committed {}",
                committer.person.name,
                relative_date(&committer.date, now)
            )));
        }
    }
    lines.push(Spans::from(vec![
        Span::raw("commit "),
        Span::styled(node.oid.clone(), Style::default().fg(Color::Yellow)),
    ]));
    if !node.parents.is_empty() {
        let parents: Vec<&str> = node
            .parents
            .iter()
            .map(|p| p.abbreviated_oid.as_str())
            .collect();
        lines.push(Spans::from(format!("parents {}", parents.join(", "))));
    }
    if options.expand_body {
        if let Some(body) = &node.body {
            lines.push(Spans::from(""));
            lines.extend(body.lines().map(|l| Spans::from(l.to_string())));
        }
    }
    lines
}

pub fn relative_date(date: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(date) else {
        return date.to_string();
    };
    let seconds = (now - then.with_timezone(&Utc)).num_seconds();
    let (amount, unit) = match seconds {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 30 * 86_400 => (s / 86_400, "day"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };
    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}
