//! # notevault
//!
//! Command-line client for NoteVault repositories.
//!
//! ## Commands
//!
//! - `init`: Create an empty local repository
//! - `add`, `list`, `delete`: Edit notes
//! - `connect`: Use a directory as cloud storage
//! - `sync`: Synchronize with the cloud repository
//! - `pull`, `push`: Transfer a single note
//! - `status`: Show repository and sync state
//! - `safe create`, `lock`, `show`: Password-protected notes
//!
//! ## Example
//!
//! ```bash
//! notevault init
//! notevault add "Buy milk" --tag home
//! notevault connect /mnt/shared/notevault
//! notevault sync
//!
//! # On another device, enter the transfer code shown by the first sync
//! notevault sync --code abcd-efgh-ijkm-npqr
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod feedback;

use commands::{connect, init, notes, safes, status, sync, Workspace};
use config::AppConfig;
use vault_sync::RepositoryChoice;

/// Command-line client for NoteVault repositories.
#[derive(Parser, Debug)]
#[command(name = "notevault")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the repository and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to notevault.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty local repository
    Init,

    /// Add a note
    Add {
        /// Note content
        text: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },

    /// List notes
    List,

    /// Delete a note
    Delete {
        /// Note id
        id: String,
    },

    /// Use a directory as cloud storage
    Connect {
        /// Directory shared between devices
        dir: PathBuf,
    },

    /// Synchronize with the cloud repository
    Sync {
        /// Transfer code shown on the first device
        #[arg(long)]
        code: Option<String>,

        /// Which repository to keep when local and cloud are unrelated
        #[arg(long, value_enum)]
        keep: Option<KeepArg>,

        /// Run as a background sync: skip when unchanged, never ask
        #[arg(long, conflicts_with_all = ["code", "keep", "ask_code"])]
        auto: bool,

        /// Prompt for a transfer code when none of the stored ones works
        #[arg(long)]
        ask_code: bool,
    },

    /// Replace the local copy of a note with the cloud copy
    Pull {
        /// Note id
        id: String,
    },

    /// Replace the cloud copy of a note with the local copy
    Push {
        /// Note id
        id: String,
    },

    /// Show repository and sync state
    Status,

    /// Manage password-protected safes
    Safe {
        #[command(subcommand)]
        command: SafeCommands,
    },

    /// Encrypt a note with a safe key
    Lock {
        /// Note id
        note: String,

        /// Safe id
        safe: String,

        /// Safe password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Print a note, unlocking its safe if needed
    Show {
        /// Note id
        id: String,

        /// Safe password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SafeCommands {
    /// Create a safe sealed under a password
    Create {
        /// Safe password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },
}

/// Answer to the repository choice.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeepArg {
    /// Keep the local repository
    Local,
    /// Keep the cloud repository
    Cloud,
}

impl From<KeepArg> for RepositoryChoice {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::Local => RepositoryChoice::KeepLocal,
            KeepArg::Cloud => RepositoryChoice::KeepCloud,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let app_config = AppConfig::locate(cli.config.as_deref(), &data_dir)?;
    init_logging(&app_config, cli.verbose);

    let workspace = Workspace::new(&data_dir, app_config);

    match cli.command {
        Commands::Init => init::run(&workspace).await?,
        Commands::Add { text, tags } => notes::add(&workspace, &text, &tags).await?,
        Commands::List => notes::list(&workspace).await?,
        Commands::Delete { id } => notes::delete(&workspace, &id).await?,
        Commands::Connect { dir } => connect::run(&workspace, &dir).await?,
        Commands::Sync {
            code,
            keep,
            auto,
            ask_code,
        } => {
            if auto {
                sync::auto(&workspace).await?;
            } else {
                let options = sync::SyncOptions {
                    code,
                    keep: keep.map(Into::into),
                    ask_code,
                };
                sync::run(&workspace, options).await?;
            }
        }
        Commands::Pull { id } => sync::pull(&workspace, &id).await?,
        Commands::Push { id } => sync::push(&workspace, &id).await?,
        Commands::Status => status::run(&workspace).await?,
        Commands::Safe {
            command: SafeCommands::Create { password },
        } => safes::create(&workspace, password.as_deref()).await?,
        Commands::Lock {
            note,
            safe,
            password,
        } => safes::lock(&workspace, &note, &safe, password.as_deref()).await?,
        Commands::Show { id, password } => {
            safes::show(&workspace, &id, password.as_deref()).await?
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` or the configured filter.
fn init_logging(config: &AppConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for notevault.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "notevault", "notevault")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
