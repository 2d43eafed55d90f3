// src/main.rs

use rev_sidebar::app::App;
use rev_sidebar::config::Config;
use rev_sidebar::ui::draw;
use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use env_logger::{Env, Target};
use log::{info, warn};
use std::fs::File;
use std::path::Path;
use std::{io, thread, time::Duration};
use tokio::sync::mpsc;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.log_file.as_deref())?;

    // Opened before raw mode so that setup errors print normally.
    let mut app = App::new(&config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error running app: {err:?}");
    }

    Ok(())
}

/// Logs go to a file since the terminal belongs to the UI; without one,
/// no logger is installed.
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Couldn't create log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    info!("logging to {}", path.display());
    Ok(())
}

/// Reads terminal events on a plain thread so the async loop never blocks.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(250)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("terminal poll failed: {e}");
                    break;
                }
            }
            match event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("terminal read failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

async fn run_app<B: tui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut events = spawn_event_reader();
    loop {
        terminal.draw(|f| draw(f, app))?;

        tokio::select! {
            event = events.recv() => match event {
                Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    app.handle_key_event(key);
                }
                Some(_) => {}
                None => return Ok(()),
            },
            Some(loaded) = app.sidebar.next_loaded() => {
                app.sidebar.apply(loaded);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
