use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use std::io;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod service;
mod storage;
mod tui;

use tui::app::App;

fn main() -> Result<()> {
    let data_dir = storage::local_store::default_data_dir();
    // Keep the guard alive so buffered log lines flush on exit.
    let _log_guard = init_logger(&data_dir);

    // Setup terminal
    enable_raw_mode().map_err(|e| anyhow::anyhow!("Failed to enable raw mode: {}. Make sure you're running in a terminal.", e))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| anyhow::anyhow!("Failed to enter alternate screen: {}. Make sure you're running in a terminal.", e))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| anyhow::anyhow!("Failed to create terminal: {}. Make sure you're running in a terminal.", e))?;

    let mut app = App::new(&data_dir)?;

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| app.render(f))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key.code, key.modifiers)?;
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}

/// Log to a file under the data directory; the terminal belongs to the TUI.
fn init_logger(data_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        eprintln!("failed to create data dir `{}`: {e}", data_dir.display());
    }
    let file_appender = tracing_appender::rolling::never(data_dir, "jotter.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jotter=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();

    guard
}
