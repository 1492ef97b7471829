use chrono::{Local, NaiveDate};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

mod progress;
mod rules;
mod session;
mod store;
mod task;
mod ui;

use session::Session;
use store::JsonFileStore;
use task::AppData;

#[derive(Parser, Debug)]
#[command(
    name = "dayboard",
    version,
    about = "Per-day task checklist for the terminal"
)]
struct Args {
    /// Task and user definitions file
    #[arg(long, default_value = "tasks.json")]
    tasks: PathBuf,

    /// Persistent state file (progress, accounts, session)
    #[arg(long, default_value = "dayboard_state.json")]
    state: PathBuf,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Log file; logs go here so they never fight the alternate screen
    #[arg(long, default_value = "dayboard.log")]
    log: PathBuf,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_tracing(&args.log)?;

    // A broken definitions file is not fatal: start on empty definitions and
    // let the UI surface the problem as a toast.
    let (data, load_error) = match AppData::load(&args.tasks) {
        Ok(data) => (data, None),
        Err(message) => (AppData::default(), Some(message)),
    };

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let store = JsonFileStore::open(args.state);
    let mut session = Session::new(data, Box::new(store), today);
    session.check_auth();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut session, load_error);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

fn setup_tracing(path: &Path) -> eyre::Result<()> {
    let file = fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
