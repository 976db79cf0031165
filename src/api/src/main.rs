//! Turf-form
//!
//! Ingests program and results sheets into a performance history and derives horse form
//! summaries from it.

mod cli;
mod config;
mod derivation;
mod ingest;
mod lookup;
mod names;
mod sheets;
mod storage;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turf_form=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            database,
            program,
            results,
        } => cli::run_migrate(database, program, results),
        Commands::Lookup { database, today } => cli::run_lookup(database, today),
        Commands::Show {
            name,
            database,
            format,
            today,
        } => cli::run_show(name, database, format, today),
    }
}
