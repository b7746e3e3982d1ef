//! SchemaSync CLI
//!
//! Keeps a local schema file in step with a branch-versioned database.
//!
//! # Commands
//!
//! - `deploy` - Migrate the branch of the current git branch to the local schema
//! - `pull` - Overwrite the local schema file with the branch schema
//! - `log` - Show the migration history, optionally across forks
//! - `dump` - Export a branch to a directory of line-delimited files
//! - `load` - Import such a directory into a branch
//! - `random-data` - Insert random records for development
//! - `status` - Show the git status of the schema file

mod commands;
mod git;
mod http_client;
mod settings;
mod terminal;

use clap::{Parser, Subcommand};
use commands::Context;
use http_client::{HttpConfig, API_KEY_ENV, DEFAULT_URL};
use schemasync_engine::{EngineConfig, SyncError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Schema migration and data sync for branch-versioned databases.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing config.json and the schema file
    #[arg(global = true, short, long, default_value = "schemasync")]
    dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Apply migrations without asking for confirmation
    #[arg(global = true, short, long)]
    yes: bool,

    /// Service URL
    #[arg(global = true, long, env = "SCHEMASYNC_URL", default_value = DEFAULT_URL)]
    url: String,

    /// API key
    #[arg(global = true, long, env = "SCHEMASYNC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the local schema to the branch of the current git branch
    Deploy,

    /// Pull the schema file from the remote branch
    Pull,

    /// Show the migration history of the branch
    Log {
        /// Follow the history across branch forks
        #[arg(short, long)]
        follow: bool,
    },

    /// Dump a branch into a new directory
    Dump {
        /// Branch URL, like https://{workspace}.{domain}/db/{database}:{branch}
        #[arg(long)]
        branch_url: String,

        /// Directory to create
        #[arg(short, long)]
        output: PathBuf,

        /// Records requested per page
        #[arg(long, default_value = "10")]
        page_size: usize,
    },

    /// Load a dump directory into a branch
    Load {
        /// Branch URL, like https://{workspace}.{domain}/db/{database}:{branch}
        #[arg(long)]
        branch_url: String,

        /// Dump directory
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Insert random records
    RandomData {
        /// Table to fill (default: all); may be repeated
        #[arg(short, long)]
        table: Vec<String>,

        /// Records per table
        #[arg(short = 'n', long, default_value = "25")]
        records: usize,

        /// Seed for reproducible records
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the git status of the schema file
    Status,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut http = HttpConfig::default().with_base_url(cli.url);
    if let Some(key) = cli.api_key {
        http = http.with_api_key(key);
    }
    let mut ctx = Context {
        dir: cli.dir,
        yes: cli.yes,
        http,
        engine: EngineConfig::default(),
    };

    let result = match cli.command {
        Commands::Deploy => commands::deploy::run(&ctx),
        Commands::Pull => commands::pull::run(&ctx),
        Commands::Log { follow } => commands::log::run(&ctx, follow),
        Commands::Dump {
            branch_url,
            output,
            page_size,
        } => {
            ctx.engine = ctx.engine.with_page_size(page_size);
            commands::dump::run(&ctx, &branch_url, &output)
        }
        Commands::Load { branch_url, input } => commands::load::run(&ctx, &branch_url, &input),
        Commands::RandomData {
            table,
            records,
            seed,
        } => commands::random_data::run(&ctx, &table, records, seed),
        Commands::Status => commands::status::run(&ctx),
        Commands::Version => {
            println!("SchemaSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Schema format v{}", schemasync_schema::SCHEMA_FORMAT_VERSION);
            Ok(())
        }
    };

    if let Err(e) = &result {
        if e.downcast_ref::<SyncError>().is_some_and(SyncError::is_unauthorized) {
            eprintln!("Authentication failed; check the key in {}.", API_KEY_ENV);
        }
    }
    result
}
