//! Klept CLI
//!
//! Command-line interface for Klept - local-first bookmarks with gist sync.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use klept_core::{Config, Library, SyncTask, ViewQuery};

mod commands;
mod output;
mod prompt;

use commands::bookmark::BookmarkEdit;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "klept")]
#[command(about = "Klept - Local-first bookmarks with gist sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a bookmark
    Add {
        /// URL to save (https:// is added when no scheme is given)
        url: String,
        /// Title (looked up from the page if omitted)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Tags to add (repeat or comma-separate)
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List bookmarks (pinned first, then newest)
    #[command(alias = "ls")]
    List {
        /// Only bookmarks with this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Match title, URL or tags
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Edit a bookmark (prompts when no fields are given)
    Edit {
        /// Bookmark ID (full or prefix)
        id: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        url: Option<String>,
        /// Replacement tags, comma-separated
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Pin or unpin a bookmark
    Pin {
        /// Bookmark ID (full or prefix)
        id: String,
    },
    /// Delete a bookmark
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID (full or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Open the top match in the browser
    Open {
        /// Search text
        query: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// List all tags
    Tags,
    /// Sync with the gist now
    Sync,
    /// Show status (storage, sync)
    Status,
    /// Show or set sync credentials and theme
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Handle a deep link (?tag=... or ?action=add&url=...)
    Link {
        /// Full URL or query string
        link: String,
    },
    /// Print a bookmarklet that sends pages to the add action
    Bookmarklet {
        /// URL the bookmarklet should open
        app_url: String,
    },
}

#[derive(Subcommand, Clone)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Set a value (gist_id, github_token, theme)
    Set { key: String, value: String },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, gist_file, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need the library
    match &cli.command {
        Commands::Config { command } => {
            return handle_config_command(command.clone(), config_path, &output);
        }
        Commands::Bookmarklet { app_url } => {
            commands::link::show_bookmarklet(app_url, &output);
            return Ok(());
        }
        _ => {}
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let library = Library::open_with_config(config)?;

    // Start-up reconciliation; `sync` runs it explicitly and reports the result
    if !matches!(cli.command, Commands::Sync) {
        auto_pull(&library, &output).await;
    }

    let pending = match cli.command {
        Commands::Config { .. } | Commands::Bookmarklet { .. } => unreachable!(), // Handled above
        Commands::Add { url, title, tag } => {
            Some(commands::bookmark::add(&library, url, title, tag, &output).await?)
        }
        Commands::List { tag, search } => {
            let query = ViewQuery::new(search.unwrap_or_default(), tag);
            commands::bookmark::list(&library, &query, &output)?;
            None
        }
        Commands::Edit {
            id,
            title,
            url,
            tags,
        } => {
            let edit = BookmarkEdit { title, url, tags };
            Some(commands::bookmark::edit(&library, id, edit, &output)?)
        }
        Commands::Pin { id } => Some(commands::bookmark::pin(&library, id, &output)?),
        Commands::Delete { id, yes } => commands::bookmark::delete(&library, id, yes, &output)?,
        Commands::Open { query, tag } => {
            let query = ViewQuery::new(query.unwrap_or_default(), tag);
            commands::bookmark::open(&library, &query, &output)?;
            None
        }
        Commands::Tags => {
            commands::tag::list(&library, &output);
            None
        }
        Commands::Sync => {
            commands::sync::sync(&library, &output).await?;
            None
        }
        Commands::Status => {
            commands::status::show(&library, &output)?;
            None
        }
        Commands::Settings { command } => handle_settings_command(command, &library, &output)?,
        Commands::Link { link } => commands::link::handle(&library, link, &output).await?,
    };

    // Let the background push finish before the process exits
    if let Some(task) = pending {
        commands::sync::finish(task, &output).await;
    }

    Ok(())
}

fn handle_settings_command(
    command: Option<SettingsCommands>,
    library: &Library,
    output: &Output,
) -> Result<Option<SyncTask>> {
    match command {
        Some(SettingsCommands::Show) | None => {
            commands::settings::show(library, output)?;
            Ok(None)
        }
        Some(SettingsCommands::Set { key, value }) => {
            commands::settings::set(library, key, value, output).map(Some)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Pull from the gist if sync is configured; failures are only reported
async fn auto_pull(library: &Library, output: &Output) {
    if !library.settings().sync_enabled() {
        return;
    }

    if let klept_core::SyncOutcome::Failed(message) = library.auto_pull().await {
        output.warning(&format!("Auto-sync failed: {}", message));
    }
}

fn init_logging(config: &Config) {
    // Only log if KLEPT_LOG is set
    let Ok(log_level) = std::env::var("KLEPT_LOG") else {
        return;
    };

    let log_path = config
        .log_file
        .clone()
        .unwrap_or_else(|| config.default_log_path());

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("klept_core={},klept_cli={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
