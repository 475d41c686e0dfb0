//! Cognivault CLI - serves the collections API and manages its config

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use cognivault::config::{self, CognivaultConfig};
use cognivault::storage::Database;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cognivault")]
#[command(version)]
#[command(about = "Collections of tagged text snippets over HTTP, backed by SQLite")]
#[command(long_about = r#"
Cognivault stores text snippets under tags, grouped into named collections,
and serves them through a JSON HTTP API.

Example usage:
  cognivault init
  cognivault serve --port 8080
  cognivault stats --database cognivault.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Address to listen on
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Answer 404 when deleting a collection that does not exist
        #[arg(long)]
        strict_deletes: bool,
    },

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts of a database
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Serve { database, host, port, strict_deletes } => {
            let mut settings = file_config.resolve();
            if let Some(database) = database {
                settings.database = database;
            }
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            settings.strict_deletes |= strict_deletes;

            cognivault::server::start_server(settings).await?;
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &CognivaultConfig::with_defaults(), force)?;
            println!("Wrote config to {}", path.display());
        }

        Commands::Stats { database } => {
            let database = database.unwrap_or_else(|| file_config.resolve().database);
            let db = Database::open(&database)?;
            println!("Cognivault Statistics ({})", database.display());
            println!("------------------------------------");
            println!("{}", db.stats()?);
        }
    }

    Ok(())
}
