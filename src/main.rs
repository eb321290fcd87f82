//! Command-line interface for loadsim
//!
//! # Usage Examples
//!
//! ## Validate
//! ```bash
//! # Parse the workload and every step's parameters, no database needed
//! loadsim validate --workload workload.yaml
//! ```
//!
//! ## Run
//! ```bash
//! # Drive every step for ten minutes with a fixed seed
//! loadsim run \
//!   --workload workload.yaml \
//!   --mongodb-connection-string mongodb://localhost:27017 \
//!   --mongodb-database loadsim \
//!   --duration 10m \
//!   --seed 42
//! ```
//!
//! Logging is controlled by `RUST_LOG`, e.g. `RUST_LOG=info,workload_runner=debug`
//! shows every reported operation.

use anyhow::Context;
use bson::Document;
use clap::{Parser, Subcommand};
use loadsim::config::parse_duration;
use loadsim::connect::{connect_to_mongodb, mask_connection_password};
use loadsim::driver::drive;
use loadsim::workload::Workload;
use loadsim::MongoOpts;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use workload_runner::{DocumentCollection, LogReporter, MongoCollection};

#[derive(Parser)]
#[command(name = "loadsim")]
#[command(about = "A workload runner driving synthetic traffic against MongoDB")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every step of a workload against MongoDB
    Run {
        /// Path to workload YAML file
        #[arg(long, short = 'w')]
        workload: PathBuf,

        /// MongoDB connection options
        #[command(flatten)]
        mongo: MongoOpts,

        /// How long to run (e.g. "300", "90s", "10m", "1h")
        #[arg(long, default_value = "60s")]
        duration: String,

        /// Random seed for generation (overrides the workload file)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check a workload file without connecting to a database
    Validate {
        /// Path to workload YAML file
        #[arg(long, short = 'w')]
        workload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            workload,
            mongo,
            duration,
            seed,
        } => run_workload(workload, mongo, &duration, seed).await,
        Commands::Validate { workload } => {
            let loaded = Workload::from_file(&workload, None)?;
            loaded.validate()?;
            tracing::info!(
                "Workload {:?} is valid: {} steps",
                workload,
                loaded.schema.workloads.len()
            );
            Ok(())
        }
    }
}

async fn run_workload(
    path: PathBuf,
    mongo: MongoOpts,
    duration: &str,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let duration =
        parse_duration(duration).with_context(|| format!("Invalid --duration '{duration}'"))?;

    let workload = Workload::from_file(&path, seed)?;
    workload.validate()?;

    tracing::info!(
        "Connecting to MongoDB {} (database {})",
        mask_connection_password(&mongo.mongodb_connection_string),
        mongo.mongodb_database
    );
    let database = connect_to_mongodb(&mongo).await?;

    let runners = workload.build_runners(
        |name| {
            Arc::new(MongoCollection::new(database.collection::<Document>(name)))
                as Arc<dyn DocumentCollection>
        },
        Arc::new(LogReporter),
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping runners");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = drive(runners, duration, shutdown_rx).await;

    let report = serde_yaml::to_string(&summary).context("Failed to render run summary")?;
    println!("{report}");

    let failed = summary.failed();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|r| r.name.as_str()).collect();
        anyhow::bail!("{} runner(s) failed: {}", failed.len(), names.join(", "));
    }

    tracing::info!("Workload {:?} completed (seed={})", path, workload.seed);
    Ok(())
}
