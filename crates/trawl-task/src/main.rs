//! # trawl — Scroll-Query Task Runner
//!
//! Reads a task payload, drains every matching record from the search
//! backend, and hands the aggregated result set to a consumer: reshaped
//! granules for the reingest workflow, a persisted result object for
//! everything else.

mod granules;
mod payload;
mod store;

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trawl_client::{ResultSet, SearchClient, SearchConfig};

use payload::TaskPayload;
use store::{FsStore, ObjectStore};

/// Workflow whose output is the reshaped granule document.
const REINGEST_WORKFLOW: &str = "ReingestGranules";
/// Object key the persisted result set is written under.
const RESULTS_KEY: &str = "opensearch_results.json";

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "trawl",
    version = "0.1.0",
    about = "Drain scroll queries against a search backend"
)]
struct Args {
    /// Task payload JSON file, or `-` to read it from stdin
    payload: PathBuf,

    /// Path to config file
    #[arg(long, default_value = "trawl.toml")]
    config: PathBuf,

    /// Root directory of the filesystem result store
    #[arg(long, default_value = "results")]
    results_root: PathBuf,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    results: ResultsConfig,
}

#[derive(Debug, Deserialize)]
struct ResultsConfig {
    /// Bucket the persisted result object is written under.
    #[serde(default = "default_results_bucket")]
    bucket: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            bucket: default_results_bucket(),
        }
    }
}

fn default_results_bucket() -> String {
    "trawl-results".into()
}

// =============================================================================
// Runner
// =============================================================================

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let raw = if args.payload.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.payload)?
    };
    let task: TaskPayload = serde_json::from_str(&raw)?;
    tracing::info!("task payload: {}", raw.trim());

    let config: Config = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).unwrap_or_default();
        toml::from_str(&content).unwrap_or_default()
    } else {
        Config::default()
    };

    // The payload's record type, when given, wins over the config file's.
    let mut search = config.search;
    if let Some(record_type) = &task.config.search_params().record_type {
        search.record_type = record_type.clone();
    }

    let client = SearchClient::new(search)?;
    let results = client.scroll_all(task.config.scroll_spec()).await?;
    tracing::info!("record_count: {}", results.len());

    let output = if task.config.workflow_name.as_deref() == Some(REINGEST_WORKFLOW) {
        granules::reingest_output(&results.records)
    } else {
        persist(&args.results_root, &config.results.bucket, &results).await?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn persist(root: &PathBuf, bucket: &str, results: &ResultSet) -> Result<Value, Box<dyn Error>> {
    tracing::info!("writing results to {}/{}", bucket, RESULTS_KEY);
    let store = FsStore::new(root);
    store
        .put(bucket, RESULTS_KEY, serde_json::to_vec(&results.records)?)
        .await?;
    Ok(json!({
        "bucket": bucket,
        "key": RESULTS_KEY,
        "record_count": results.len(),
    }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "trawl=info,trawl_client=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("task failed: {}", e);
        std::process::exit(1);
    }
}
