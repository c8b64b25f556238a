// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipesim.

pub mod graph;
pub mod list;
pub mod plan;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::{Manifest, RunnerConfig, DEFAULT_MANIFEST};
use crate::errors::PipesimError;
use crate::registry::Registry;

/// Dependency-graph pipeline runner
#[derive(Parser, Debug)]
#[clap(
    name = "pipesim",
    version,
    about = "Plan and run staged pipelines as dependency graphs",
    long_about = None,
    after_help = "Examples:\n\
        pipesim list                           Show pipelines in .pipesim.yaml\n\
        pipesim plan my-pipeline               Show execution waves\n\
        pipesim run my-pipeline --simulate     Simulate a run\n\
        pipesim run my-pipeline --fail build   Simulate a run where 'build' fails\n\n\
        See 'pipesim <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Manifest file
    #[clap(
        short = 'f',
        long = "file",
        global = true,
        env = "PIPESIM_MANIFEST",
        default_value = DEFAULT_MANIFEST,
        value_name = "MANIFEST"
    )]
    pub manifest: PathBuf,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered pipelines and artifacts
    List,

    /// Validate one pipeline, or every pipeline in the manifest
    Validate {
        /// Pipeline id
        pipeline: Option<String>,
    },

    /// Show the execution waves of a pipeline
    Plan {
        /// Pipeline id
        pipeline: String,

        /// Output format (text, json)
        #[clap(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline id
        pipeline: String,

        /// Output format (text, dot, mermaid)
        #[clap(long, default_value = "text")]
        format: GraphFormat,
    },

    /// Run a pipeline wave by wave
    Run {
        /// Pipeline id
        pipeline: String,

        /// Use the simulated runner instead of the shell
        #[clap(long)]
        simulate: bool,

        /// Make a stage fail in simulation (implies --simulate)
        #[clap(long = "fail", value_name = "STAGE")]
        fail: Vec<String>,

        /// Print the final summary as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Output format for plan command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Load a manifest into a registry, printing a recovery hint on failure
pub fn load_registry(path: &Path) -> miette::Result<(RunnerConfig, Registry)> {
    Manifest::load(path)
        .and_then(Manifest::into_registry)
        .map_err(|e| report(e).into())
}

/// Print the recovery hint of an error, if it has one, and hand it back
pub fn report(error: PipesimError) -> PipesimError {
    if let Some(suggestion) = error.suggestion() {
        eprintln!("{}", suggestion.to_string().yellow());
    }
    error
}
