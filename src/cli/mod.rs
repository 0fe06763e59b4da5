use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{BackendChoice, ConfigLoader};
use crate::notes::NoteRepository;
use crate::store::{self, KeyValueStore};

pub mod commands;

use self::commands::{DeleteArgs, LegacyArgs, ListArgs, NewArgs, ShowArgs};

const LOG_FILE: &str = "richnotes.log";

#[derive(Parser, Debug)]
#[command(
    name = "richnotes",
    version,
    about = "Rich-text notes in the terminal with debounced autosave"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RICHNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RICHNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Force a storage backend (auto, native, local)
    #[arg(long)]
    pub backend: Option<BackendChoice>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive editor (default)
    Tui,
    /// Create a new note from the command line
    New(NewArgs),
    /// Print the note list, optionally filtered
    List(ListArgs),
    /// Print a note as plain text
    Show(ShowArgs),
    /// Delete a note by id
    Delete(DeleteArgs),
    /// Read or write the single-note notepad from the first release
    Legacy(LegacyArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("RICHNOTES_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("RICHNOTES_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_target = match command {
        Commands::Tui => LogTarget::File(paths.log_dir.join(LOG_FILE)),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, &log_target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    let backend = store::open(&config.storage).context("opening note storage")?;
    tracing::info!(backend = %backend.kind(), "storage ready");
    let repo = NoteRepository::new(Box::new(backend));

    let config = Arc::new(config);
    match command {
        Commands::Tui => {
            let mut app = App::new(config, repo)?;
            commands::run_tui(&mut app)
        }
        Commands::New(args) => commands::new_note(repo, args),
        Commands::List(args) => commands::list_notes(&config, repo, args),
        Commands::Show(args) => commands::show_note(repo, args),
        Commands::Delete(args) => commands::delete_note(repo, args),
        Commands::Legacy(args) => commands::handle_legacy_command(repo, args),
    }
}

enum LogTarget {
    Stderr,
    /// The editor owns the terminal, so its logs go to a file.
    File(PathBuf),
}

fn init_tracing(level: &str, target: &LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = open_log_file(path)?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
