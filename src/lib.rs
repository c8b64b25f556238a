// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! # pipesim - dependency-graph pipeline runner
//!
//! `pipesim` runs staged pipelines (source, build, test, deploy, release) as
//! dependency graphs instead of fixed sequences.
//!
//! ## Features
//!
//! - **Validated graphs** - unknown dependencies, duplicate ids and cycles are
//!   rejected before anything runs
//! - **Wave scheduling** - independent stages run concurrently, dependents wait
//!   for every dependency
//! - **Failure isolation** - a failed stage skips only what depends on it
//! - **Pluggable runners** - shell, simulated, and a retrying decorator
//!
//! ## Quick Start
//!
//! ```bash
//! # Show what a manifest declares
//! pipesim --file demos/pipesim.yaml list
//!
//! # Show execution waves
//! pipesim --file demos/pipesim.yaml plan my-pipeline
//!
//! # Simulate a run where the build fails
//! pipesim --file demos/pipesim.yaml run my-pipeline --fail build
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use std::sync::Arc;
//! use pipesim::pipeline::{PipelineDefinition, Scheduler, StageDefinition, StageGraph, StageKind};
//! use pipesim::runner::SimulatedRunner;
//!
//! # async fn demo() -> pipesim::PipesimResult<()> {
//! let pipeline = PipelineDefinition::new("ci", "CI")
//!     .with_stage(StageDefinition::new("src", StageKind::Source, "git pull"))
//!     .with_stage(StageDefinition::new("build", StageKind::Build, "make").depends_on(["src"]));
//!
//! let plan = Scheduler::plan(StageGraph::build(Arc::new(pipeline))?);
//! let scheduler = Scheduler::new(Arc::new(SimulatedRunner::new()));
//! let mut ctx = scheduler.start(plan)?;
//! let summary = scheduler.run(&mut ctx).await?;
//! assert!(summary.status.is_success());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use errors::{ExecutionError, PipesimError, PipesimResult, ValidationError};
pub use pipeline::{ExecutionContext, PipelineDefinition, Scheduler, StageDefinition, StageGraph};
pub use registry::Registry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
