//! QuoteX CLI
//!
//! Command-line interface for QuoteX - scripture promises and the daily Proverbs quote.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use quotex_core::{Config, NodePath, Store};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quotex")]
#[command(about = "QuoteX - Scripture promises and the daily Proverbs quote")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the quote of the day
    Quote {
        /// Day to pick the chapter for (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
        /// Seed for a repeatable verse choice
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a whole Proverbs chapter
    Chapter {
        /// Chapter number (1-31)
        number: u32,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage titles within a category
    Title {
        #[command(subcommand)]
        command: TitleCommands,
    },
    /// Manage subtitles within a title
    Subtitle {
        #[command(subcommand)]
        command: SubtitleCommands,
    },
    /// Manage promises
    Promise {
        #[command(subcommand)]
        command: PromiseCommands,
    },
    /// Export all promises as a JSON backup
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON backup
    Import {
        /// Backup file
        file: PathBuf,
    },
    /// Show the quote overlay, driven by screen events on stdin
    Watch,
    /// Show status (storage, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List all categories
    #[command(alias = "ls")]
    List,
    /// Create a category
    #[command(alias = "create")]
    Add { name: String },
    /// Rename a category
    Rename { name: String, new_name: String },
    /// Delete a category with everything under it
    #[command(alias = "rm")]
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TitleCommands {
    /// List the titles of a category
    #[command(alias = "ls")]
    List { category: String },
    /// Create a title
    #[command(alias = "create")]
    Add { category: String, name: String },
    /// Rename a title
    Rename {
        category: String,
        name: String,
        new_name: String,
    },
    /// Delete a title with everything under it
    #[command(alias = "rm")]
    Delete {
        category: String,
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SubtitleCommands {
    /// List the subtitles of a title
    #[command(alias = "ls")]
    List { category: String, title: String },
    /// Create a subtitle
    #[command(alias = "create")]
    Add {
        category: String,
        title: String,
        name: String,
    },
    /// Rename a subtitle
    Rename {
        category: String,
        title: String,
        name: String,
        new_name: String,
    },
    /// Delete a subtitle and its promises
    #[command(alias = "rm")]
    Delete {
        category: String,
        title: String,
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PromiseCommands {
    /// List promises (all, or those under one subtitle)
    #[command(alias = "ls")]
    List {
        category: Option<String>,
        title: Option<String>,
        subtitle: Option<String>,
    },
    /// Show a promise
    Show { id: i64 },
    /// Add a promise under an existing subtitle
    #[command(alias = "create")]
    Add {
        category: String,
        title: String,
        subtitle: String,
        /// Verse text
        #[arg(long)]
        verse: String,
        /// The promise's own title
        #[arg(short = 'T', long = "promise-title")]
        promise_title: Option<String>,
        /// Scripture reference, e.g. "Josh 1:9"
        #[arg(short, long)]
        reference: Option<String>,
    },
    /// Edit a promise
    Edit {
        id: i64,
        #[arg(long)]
        verse: Option<String>,
        #[arg(short = 'T', long = "promise-title")]
        promise_title: Option<String>,
        #[arg(short, long)]
        reference: Option<String>,
    },
    /// File a promise under another subtitle
    #[command(alias = "mv")]
    Move {
        id: i64,
        category: String,
        title: String,
        subtitle: String,
    },
    /// Delete a promise
    #[command(alias = "rm")]
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search promise text, references and node names
    Search { query: String },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, corpus_path, chapter_cache_ttl_secs, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    // Commands that don't need the store
    let command = match cli.command {
        Commands::Config { command } => return handle_config_command(command, config, &output),
        Commands::Quote { date, seed } => {
            return commands::quote::today(&config, date, seed, &output)
        }
        Commands::Chapter { number } => return commands::quote::chapter(&config, number, &output),
        Commands::Watch => return commands::watch::run(&config, &output).await,
        command => command,
    };

    let mut store = Store::open(&config).context("Failed to open promise store")?;

    match command {
        Commands::Category { command } => handle_category_command(command, &mut store, &output),
        Commands::Title { command } => handle_title_command(command, &mut store, &output),
        Commands::Subtitle { command } => handle_subtitle_command(command, &mut store, &output),
        Commands::Promise { command } => handle_promise_command(command, &mut store, &output),
        Commands::Export { output: file } => commands::backup::export(&store, file, &output),
        Commands::Import { file } => commands::backup::import(&mut store, file, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. }
        | Commands::Quote { .. }
        | Commands::Chapter { .. }
        | Commands::Watch => Ok(()), // Handled above
    }
}

/// Install the tracing subscriber
///
/// Logs go to `log_file` when configured, stderr otherwise.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let env_filter = EnvFilter::new(format!("quotex_core={},quotex_cli={}", level, level));

    let log_file = config.log_file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Warning: Could not open log file {:?}: {}", path, e))
            .ok()
    });

    // Ignore error if already initialized
    let _ = match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    debug!("Logging initialized at level {}", level);
}

fn handle_category_command(
    command: CategoryCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        CategoryCommands::List => commands::category::list(store, output),
        CategoryCommands::Add { name } => commands::category::add(store, name, output),
        CategoryCommands::Rename { name, new_name } => {
            commands::category::rename(store, name, new_name, output)
        }
        CategoryCommands::Delete { name, yes } => {
            commands::category::delete(store, name, yes, output)
        }
    }
}

fn handle_title_command(command: TitleCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        TitleCommands::List { category } => commands::title::list(store, category, output),
        TitleCommands::Add { category, name } => {
            commands::title::add(store, category, name, output)
        }
        TitleCommands::Rename {
            category,
            name,
            new_name,
        } => commands::title::rename(store, category, name, new_name, output),
        TitleCommands::Delete {
            category,
            name,
            yes,
        } => commands::title::delete(store, category, name, yes, output),
    }
}

fn handle_subtitle_command(
    command: SubtitleCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        SubtitleCommands::List { category, title } => {
            commands::subtitle::list(store, category, title, output)
        }
        SubtitleCommands::Add {
            category,
            title,
            name,
        } => commands::subtitle::add(store, category, title, name, output),
        SubtitleCommands::Rename {
            category,
            title,
            name,
            new_name,
        } => commands::subtitle::rename(store, category, title, name, new_name, output),
        SubtitleCommands::Delete {
            category,
            title,
            name,
            yes,
        } => commands::subtitle::delete(store, category, title, name, yes, output),
    }
}

fn handle_promise_command(
    command: PromiseCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        PromiseCommands::List {
            category,
            title,
            subtitle,
        } => {
            let path = optional_path(category, title, subtitle)?;
            commands::promise::list(store, path, output)
        }
        PromiseCommands::Show { id } => commands::promise::show(store, id, output),
        PromiseCommands::Add {
            category,
            title,
            subtitle,
            verse,
            promise_title,
            reference,
        } => commands::promise::add(
            store,
            NodePath::new(category, title, subtitle),
            verse,
            promise_title,
            reference,
            output,
        ),
        PromiseCommands::Edit {
            id,
            verse,
            promise_title,
            reference,
        } => commands::promise::edit(store, id, verse, promise_title, reference, output),
        PromiseCommands::Move {
            id,
            category,
            title,
            subtitle,
        } => commands::promise::move_to(store, id, NodePath::new(category, title, subtitle), output),
        PromiseCommands::Delete { id, yes } => commands::promise::delete(store, id, yes, output),
        PromiseCommands::Search { query } => commands::promise::search(store, query, output),
    }
}

/// All three names, or none of them
fn optional_path(
    category: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
) -> Result<Option<NodePath>> {
    match (category, title, subtitle) {
        (Some(c), Some(t), Some(s)) => Ok(Some(NodePath::new(c, t, s))),
        (None, None, None) => Ok(None),
        _ => bail!("Give a category, title and subtitle, or none of them"),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config: Config,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(&config, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(config, key, value, output)
        }
    }
}
