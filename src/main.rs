use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{error::Error, io, time::Duration};
use tracing_subscriber::EnvFilter;

use app::config::{Cli, Command, ServeConfig, TuiConfig};

mod app;

pub fn main() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command() {
        Command::Serve(config) => run_server(config),
        Command::Tui(config) => run_terminal(config),
    }
}

fn run_server(config: ServeConfig) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(app::server::serve(config))?;
    Ok(())
}

// Start the terminal client.
// Terminal setup and teardown follow
// https://github.com/ratatui-org/ratatui/blob/main/examples/list.rs
fn run_terminal(config: TuiConfig) -> Result<(), Box<dyn Error>> {
    // Fetch the list before switching to the alternate screen
    let app = app::ui::App::connect(app::client::ApiClient::new(&config.server));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(250);
    let res = app::ui::run_app(&mut terminal, app, tick_rate);

    // Restore previous terminal state after exit
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
