//! # changeq
//!
//! CLI tool for issuing changeq transactions.
//!
//! ## Commands
//!
//! - `request`: Run one read/create/update/delete transaction
//! - `replay`: Flush a file of change records to a collection URL
//!
//! ## Example
//!
//! ```bash
//! # Read a resource, settling no sooner than 100ms
//! changeq request read /photos/7 --delay-ms 100
//!
//! # Update with a wrapped body
//! changeq request update /photos/7 --data '{"title":"sunset"}' --wrap photo
//!
//! # Replay recorded changes against a collection
//! changeq replay changes.json --url /albums/1/photos
//!
//! # Offline demo
//! changeq --mock request delete /photos/7
//! ```

use anyhow::{Context, Result};
use changeq_sync_client::{
    ClientConfig, HttpTransport, Method, MockTransport, ReqwestTransport, Syncer,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{replay, request, LogHook};

/// Default configuration file, read when present.
const DEFAULT_CONFIG: &str = "changeq.toml";

/// CLI tool for issuing changeq transactions.
#[derive(Parser, Debug)]
#[command(name = "changeq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./changeq.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use mock transport instead of real HTTP (for testing/demo)
    #[arg(long, global = true)]
    mock: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one transaction
    Request {
        /// read, create, update or delete
        method: Method,

        /// Resource URL, absolute or relative to the configured base URL
        url: String,

        /// JSON body for create and update
        #[arg(long, short)]
        data: Option<String>,

        /// Minimum time before the transaction settles
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Nest the body under this key
        #[arg(long)]
        wrap: Option<String>,
    },

    /// Flush a JSON file of change records
    Replay {
        /// File holding `[{"action": ..., "items": [...], "at": n}, ...]`
        /// or `{"changes": [...]}`
        file: PathBuf,

        /// Collection URL
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    let transport: Arc<dyn HttpTransport> = if cli.mock {
        Arc::new(MockTransport::new())
    } else {
        Arc::new(
            ReqwestTransport::from_config(&config.transport)
                .context("Failed to create HTTP transport")?,
        )
    };
    let syncer = Arc::new(Syncer::new(transport));
    syncer.add_hook(Arc::new(LogHook));

    let output = match cli.command {
        Commands::Request {
            method,
            url,
            data,
            delay_ms,
            wrap,
        } => {
            let args = request::RequestArgs {
                method,
                url,
                data,
                delay_ms,
                wrap,
            };
            request::run(&*syncer, args).await?
        }
        Commands::Replay { file, url } => {
            replay::run(syncer, &file, &url, config.queue.clone()).await?
        }
    };

    println!("{}", output);
    Ok(())
}

/// Load the explicit config file, else `changeq.toml` if present, else defaults.
fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                ClientConfig::from_file(default).context("Failed to load changeq.toml")
            } else {
                Ok(ClientConfig::default())
            }
        }
    }
}
