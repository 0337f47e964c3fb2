//! field-backfill CLI
//!
//! Sets a field to a fixed value on every document of a MongoDB collection
//! that lacks it.
//!
//! Usage:
//!   backfill                                  Read settings from the environment (.env is loaded)
//!   backfill --target-field status --new-value migrated
//!   backfill --log-level debug                More verbose output (RUST_LOG wins if set)
//!
//! Settings (flag / environment variable):
//!   --mongo-uri        MONGO_URI
//!   --db-name          DB_NAME
//!   --collection-name  COLLECTION_NAME
//!   --target-field     TARGET_FIELD
//!   --new-value        NEW_VALUE

use anyhow::{Context, Result};
use backfill_common::config::{COLLECTION_NAME, DB_NAME, MONGO_URI, NEW_VALUE, TARGET_FIELD};
use backfill_common::{BackfillError, MigrationSettings};
use backfill_mongodb::{run, Connector, MongoConnector};
use clap::Parser;
use std::io::IsTerminal;
use tracing::{error, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Parser, Debug)]
#[command(name = "backfill")]
#[command(about = "Backfill a missing field across a MongoDB collection", long_about = None)]
#[command(version)]
struct Cli {
    /// MongoDB connection string
    #[arg(long, env = MONGO_URI, hide_env_values = true)]
    mongo_uri: Option<String>,

    /// Database to select
    #[arg(long, env = DB_NAME)]
    db_name: Option<String>,

    /// Collection to scan and update
    #[arg(long, env = COLLECTION_NAME)]
    collection_name: Option<String>,

    /// Field whose absence selects a document, and which is then set
    #[arg(long, env = TARGET_FIELD)]
    target_field: Option<String>,

    /// String value written into the target field
    #[arg(long, env = NEW_VALUE)]
    new_value: Option<String>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn settings(&self) -> MigrationSettings {
        MigrationSettings {
            mongo_uri: self.mongo_uri.clone(),
            db_name: self.db_name.clone(),
            collection_name: self.collection_name.clone(),
            target_field: self.target_field.clone(),
            new_value: self.new_value.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before parsing so clap sees the .env values.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    execute(&cli.settings(), &MongoConnector).await
}

/// Run the backfill and map its outcome onto process exit behavior
///
/// Missing configuration and operation failures are logged and end the
/// process normally; only a connection failure is returned as an error.
async fn execute<C: Connector>(settings: &MigrationSettings, connector: &C) -> Result<()> {
    match run(settings, connector).await {
        Ok(_report) => Ok(()),
        Err(e @ BackfillError::Configuration(_)) => {
            error!("Error: {}", e);
            Ok(())
        }
        Err(e) => Err(e).context("Failed to connect to MongoDB"),
    }
}

/// Initialize logging based on log level
///
/// Colors are only emitted when stdout is a terminal, so redirected output
/// stays plain text.
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::util::SubscriberInitExt;

    log_subscriber(level, std::io::stdout, std::io::stdout().is_terminal())
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}

fn log_subscriber<W>(level: &str, writer: W, ansi: bool) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(ansi).with_writer(writer))
        .with(filter)
}
