//! mflix: dataset cleanup migration
//!
//! Runs the full migration once against the configured store and prints
//! either `Nothing to update!` or `Updated N documents`.

use std::time::Duration;

use clap::{ArgGroup, Parser};
use miette::Result;
use mflix_migrate::{MigrationConfig, MigrationOutcome, Migrator};
use mflix_store::{
    DocumentStore, HttpStore, HttpStoreConfig, MongoStore, MongoStoreConfig, StoreError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "mflix")]
#[command(about = "Dataset cleanup migration for the mflix movies collection", long_about = None)]
#[command(group(ArgGroup::new("store").required(true).args(["mongodb_uri", "store_url"])))]
struct Cli {
    /// MongoDB connection string
    #[arg(long, env = "MFLIX_MONGODB_URI", hide_env_values = true)]
    mongodb_uri: Option<String>,

    /// Base URL of an HTTP store gateway, used instead of a MongoDB connection
    #[arg(long, env = "MFLIX_STORE_URL")]
    store_url: Option<String>,

    /// API key sent as a bearer token to the HTTP gateway
    #[arg(long, env = "MFLIX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Database name
    #[arg(long, env = "MFLIX_DATABASE", default_value = "sample_mflix")]
    database: String,

    /// Collection to migrate
    #[arg(long, env = "MFLIX_COLLECTION", default_value = mflix_migrate::DEFAULT_COLLECTION)]
    collection: String,

    /// Connect and request timeout in seconds
    #[arg(long, env = "MFLIX_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Preview the planned updates without applying them.
    /// Accepts "1", "true", "yes", or "on".
    #[arg(long, env = "MFLIX_DRY_RUN", value_parser = parse_bool_env, default_value = "false")]
    dry_run: bool,
}

/// Which store the migration runs against.
#[derive(Debug)]
enum StoreTarget {
    Mongo(MongoStoreConfig),
    Http(HttpStoreConfig),
}

impl StoreTarget {
    fn kind(&self) -> &'static str {
        match self {
            Self::Mongo(_) => "mongodb",
            Self::Http(_) => "http",
        }
    }

    fn database(&self) -> &str {
        match self {
            Self::Mongo(config) => &config.database,
            Self::Http(config) => &config.database,
        }
    }

    async fn open(self) -> Result<Box<dyn DocumentStore>, StoreError> {
        let store: Box<dyn DocumentStore> = match self {
            Self::Mongo(config) => Box::new(MongoStore::connect(config).await?),
            Self::Http(config) => Box::new(HttpStore::new(config)?),
        };
        Ok(store)
    }
}

impl Cli {
    fn store_target(&self) -> StoreTarget {
        let timeout = Duration::from_secs(self.timeout_secs);

        if let Some(base_url) = &self.store_url {
            let mut config = HttpStoreConfig::new(base_url.clone(), self.database.clone());
            config.api_key = self.api_key.clone().filter(|k| !k.is_empty());
            config.timeout = timeout;
            return StoreTarget::Http(config);
        }

        let uri = self.mongodb_uri.clone().unwrap_or_default();
        let mut config = MongoStoreConfig::new(uri, self.database.clone());
        config.timeout = timeout;
        StoreTarget::Mongo(config)
    }

    fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::for_collection(self.collection.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "mflix=info,mflix_migrate=info,mflix_store=info".to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    println!("Dataset cleanup migration");

    let target = cli.store_target();
    let migrator = Migrator::new(cli.migration_config()).map_err(|e| miette::miette!("{}", e))?;

    tracing::info!(
        store = target.kind(),
        database = target.database(),
        collection = %migrator.config().collection,
        dry_run = cli.dry_run,
        "starting migration"
    );

    let store = target.open().await.map_err(|e| miette::miette!("{}", e))?;
    let outcome = if cli.dry_run {
        migrator.dry_run(store.as_ref()).await
    } else {
        migrator.run(store.as_ref()).await
    }
    .map_err(|e| miette::miette!("{}", e))?;

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &MigrationOutcome) {
    if let MigrationOutcome::Updated(result) = outcome {
        for failure in &result.failures {
            println!("  Warning: {}", failure);
        }
    }

    println!("{}", outcome);

    if let MigrationOutcome::Planned(batch) = outcome {
        for instruction in batch.iter() {
            println!("  - {}", instruction);
        }
    }
}
