use chrono::Local;
use clap::Parser;
use std::{io, path::PathBuf};
use taskledger::{
    menu::{Console, Flow, Menu},
    operations, ui, Config, Store,
};
use tracing_subscriber::EnvFilter;

/// Password given to the admin account when the users file is empty.
const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Text-file task tracker with per-user task lists and overview reports.
#[derive(Parser)]
#[command(name = "taskledger", version, about)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the users, tasks and report files.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the prompts.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskledger=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), cli.data_dir)?;
    let mut store = Store::load(config.store_paths())?;
    if operations::bootstrap_admin(&mut store, &config.admin_username, DEFAULT_ADMIN_PASSWORD)? {
        eprintln!(
            "No users found. Created '{}' with password '{}'.",
            config.admin_username, DEFAULT_ADMIN_PASSWORD
        );
    }

    let console = Console::new(io::stdin().lock(), io::stdout());
    let Some(mut menu) = Menu::login(&store, &config, console)? else {
        return Ok(());
    };

    loop {
        let today = Local::now().date_naive();
        match menu.step(&mut store, today)? {
            Flow::Continue => {}
            Flow::Board => {
                if let Err(err) = ui::show_board(&mut store, menu.session(), today) {
                    eprintln!("Board view failed: {}", err);
                }
            }
            Flow::Exit => return Ok(()),
        }
    }
}
