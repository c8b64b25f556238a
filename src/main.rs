// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! pipesim - dependency-graph pipeline runner
//!
//! Plan, visualize and run staged pipelines declared in a manifest.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipesim::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipesim=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::List => pipesim::cli::list::run(cli.manifest, cli.verbose).await,
        Commands::Validate { pipeline } => {
            pipesim::cli::validate::run(cli.manifest, pipeline, cli.verbose).await
        }
        Commands::Plan { pipeline, format } => {
            pipesim::cli::plan::run(cli.manifest, pipeline, format).await
        }
        Commands::Graph { pipeline, format } => {
            pipesim::cli::graph::run(cli.manifest, pipeline, format).await
        }
        Commands::Run {
            pipeline,
            simulate,
            fail,
            json,
        } => pipesim::cli::run::run(cli.manifest, pipeline, simulate, fail, json, cli.verbose).await,
    }
}
