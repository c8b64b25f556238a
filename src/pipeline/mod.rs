// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Pipeline definitions, graph, scheduling and reporting
//!
//! A [`PipelineDefinition`] is turned into a [`StageGraph`], the graph into
//! an [`ExecutionPlan`] of waves, and the [`Scheduler`] drives an
//! [`ExecutionContext`] through that plan.

pub(crate) mod context;
pub(crate) mod dag;
mod definition;
mod report;
mod scheduler;
mod validation;

pub use context::{ContextSnapshot, ExecutionContext, SkipReason, StageRunState, StageStatus};
pub use dag::StageGraph;
pub use definition::*;
pub use report::{run_status, status_line, summarize, RunStatus, RunSummary, StatusCounts};
pub use scheduler::{ExecutionPlan, Scheduler, StageTransition, StepResult};
pub use validation::{PipelineValidator, ValidationReport};
