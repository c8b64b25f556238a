// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Wave scheduler
//!
//! Turns a validated [`StageGraph`] into an [`ExecutionPlan`] of waves and
//! drives an [`ExecutionContext`] through it. Stages inside a wave run
//! concurrently; the next wave only starts once every stage of the current
//! one is terminal.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::errors::{ExecutionError, PipesimError, PipesimResult, ValidationError};
use crate::pipeline::context::{SkipReason, StageOutcome};
use crate::pipeline::report::{run_status, summarize, RunStatus, RunSummary};
use crate::pipeline::{ExecutionContext, PipelineDefinition, StageGraph, StageStatus};
use crate::runner::{Runner, StageOutput};

/// Stages grouped into waves by topological layering
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    graph: StageGraph,
    /// Declaration indices per wave, each wave in declaration order
    waves: Vec<Vec<usize>>,
    /// Wave index per declaration index
    stage_wave: Vec<usize>,
}

impl ExecutionPlan {
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn pipeline(&self) -> &Arc<PipelineDefinition> {
        self.graph.pipeline()
    }

    pub fn stage_count(&self) -> usize {
        self.stage_wave.len()
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Stage ids of one wave
    pub fn wave(&self, index: usize) -> Option<Vec<&str>> {
        self.waves.get(index).map(|w| self.ids(w))
    }

    /// Stage ids of every wave
    pub fn waves(&self) -> Vec<Vec<&str>> {
        self.waves.iter().map(|w| self.ids(w)).collect()
    }

    /// Wave a stage belongs to
    pub fn wave_of(&self, stage_id: &str) -> Option<usize> {
        self.graph
            .index_of(stage_id)
            .and_then(|idx| self.stage_wave.get(idx).copied())
    }

    fn ids(&self, wave: &[usize]) -> Vec<&str> {
        wave.iter()
            .map(|idx| self.pipeline().stages[*idx].id.as_str())
            .collect()
    }

    /// One line per wave
    pub fn to_text(&self) -> String {
        self.waves()
            .iter()
            .enumerate()
            .map(|(i, wave)| {
                if wave.len() > 1 {
                    format!("Wave {}: {} (parallel)", i + 1, wave.join(" ∥ "))
                } else {
                    format!("Wave {}: {}", i + 1, wave.join(""))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One stage status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: String,
    pub from: StageStatus,
    pub to: StageStatus,
}

/// What a single `advance` call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Wave that was executed, `None` when there was nothing left to do
    pub wave: Option<usize>,
    /// Transitions in the order they were applied
    pub transitions: Vec<StageTransition>,
    /// Overall run status after the step
    pub status: RunStatus,
}

impl StepResult {
    /// True when the step changed nothing
    pub fn is_noop(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Stages that ended the step in `status`
    pub fn stages_ending_in(&self, status: StageStatus) -> Vec<&str> {
        self.transitions
            .iter()
            .filter(|t| t.to == status)
            .map(|t| t.stage.as_str())
            .collect()
    }
}

type StageResult = (Result<StageOutput, ExecutionError>, DateTime<Utc>);
type TaskResult = (usize, StageResult);

/// Wait for every task of a wave
///
/// A started stage whose task could not be joined is reported as failed, so
/// none is left running.
async fn join_wave(
    mut tasks: JoinSet<TaskResult>,
    started: &[usize],
) -> HashMap<usize, StageResult> {
    let mut finished = HashMap::new();
    let mut join_error = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, result)) => {
                finished.insert(idx, result);
            }
            Err(e) => {
                warn!(error = %e, "stage task failed to join");
                join_error = Some(e.to_string());
            }
        }
    }

    for &idx in started {
        finished.entry(idx).or_insert_with(|| {
            let message = format!(
                "stage task failed to join: {}",
                join_error.as_deref().unwrap_or("task lost")
            );
            (Err(ExecutionError::failed(message)), Utc::now())
        });
    }

    finished
}

/// Wave scheduler
pub struct Scheduler {
    runner: Arc<dyn Runner>,
    cancel: CancellationToken,
    max_parallel: Option<usize>,
}

impl Scheduler {
    /// Create a scheduler executing stages through `runner`
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            cancel: CancellationToken::new(),
            max_parallel: None,
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cap the number of stages running at once within a wave
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel.max(1));
        self
    }

    /// Token that cancels runs driven by this scheduler
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Group stages into waves
    ///
    /// A stage's wave is one past the deepest wave among its dependencies;
    /// stages without dependencies form wave 0.
    pub fn plan(graph: StageGraph) -> ExecutionPlan {
        let mut stage_wave = vec![0usize; graph.len()];

        for idx in graph.topological_order() {
            let wave = graph.pipeline().stages[idx]
                .dependencies
                .iter()
                .filter_map(|dep| graph.index_of(dep))
                .map(|dep| stage_wave[dep] + 1)
                .max()
                .unwrap_or(0);
            stage_wave[idx] = wave;
        }

        let wave_count = stage_wave.iter().max().map_or(0, |max| max + 1);
        let mut waves = vec![Vec::new(); wave_count];
        for (idx, wave) in stage_wave.iter().enumerate() {
            waves[*wave].push(idx);
        }

        ExecutionPlan {
            graph,
            waves,
            stage_wave,
        }
    }

    /// Create a fresh context with every stage pending
    pub fn start(
        &self,
        plan: impl Into<Arc<ExecutionPlan>>,
    ) -> Result<ExecutionContext, ValidationError> {
        let plan = plan.into();

        if plan.stage_count() == 0 {
            return Err(ValidationError::EmptyPipeline {
                pipeline: plan.pipeline().id.clone(),
            });
        }

        let ctx = ExecutionContext::new(plan);
        info!(
            pipeline = %ctx.pipeline().id,
            run_id = %ctx.run_id(),
            stages = ctx.plan().stage_count(),
            waves = ctx.plan().wave_count(),
            "run started"
        );
        Ok(ctx)
    }

    /// Execute the next wave that still has pending stages
    pub async fn advance(&self, ctx: &mut ExecutionContext) -> PipesimResult<StepResult> {
        let plan = Arc::clone(ctx.plan());

        let next_wave = plan.waves.iter().position(|wave| {
            wave.iter().any(|idx| {
                ctx.status(&plan.pipeline().stages[*idx].id) == Some(StageStatus::Pending)
            })
        });

        let Some(wave) = next_wave else {
            return Ok(StepResult {
                wave: None,
                transitions: Vec::new(),
                status: run_status(ctx),
            });
        };

        let span = info_span!(
            "wave",
            pipeline = %plan.pipeline().id,
            run_id = %ctx.run_id(),
            wave = wave + 1
        );

        self.advance_wave(ctx, &plan, wave).instrument(span).await
    }

    async fn advance_wave(
        &self,
        ctx: &mut ExecutionContext,
        plan: &ExecutionPlan,
        wave: usize,
    ) -> PipesimResult<StepResult> {
        let mut transitions = Vec::new();

        if self.cancel.is_cancelled() {
            self.skip_cancelled(ctx, &mut transitions)?;
            return Ok(StepResult {
                wave: Some(wave),
                transitions,
                status: run_status(ctx),
            });
        }

        let stages = &plan.pipeline().stages;
        let semaphore = self.max_parallel.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut started = Vec::new();
        let mut cancelled = false;

        info!(stages = ?plan.wave(wave).unwrap_or_default(), "wave started");

        for &idx in &plan.waves[wave] {
            let stage = &stages[idx];
            if ctx.status(&stage.id) != Some(StageStatus::Pending) {
                continue;
            }

            let permit = match &semaphore {
                Some(semaphore) => Some(Arc::clone(semaphore).acquire_owned().await.map_err(
                    |e| PipesimError::Internal {
                        message: e.to_string(),
                    },
                )?),
                None => None,
            };

            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            ctx.set_status(&stage.id, StageStatus::Running)?;
            transitions.push(StageTransition {
                stage: stage.id.clone(),
                from: StageStatus::Pending,
                to: StageStatus::Running,
            });

            let runner = Arc::clone(&self.runner);
            let stage = stage.clone();
            started.push(idx);
            tasks.spawn(async move {
                let _permit = permit;
                let result = AssertUnwindSafe(runner.execute(&stage))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(ExecutionError::failed("runner panicked")));
                (idx, (result, Utc::now()))
            });
        }

        // Barrier: every started stage finishes before anything is recorded
        let mut finished = join_wave(tasks, &started).await;

        // Apply in declaration order so the sequence of states is deterministic
        for &idx in &plan.waves[wave] {
            let Some((result, at)) = finished.remove(&idx) else {
                continue;
            };
            let stage_id = &stages[idx].id;

            match result {
                Ok(output) => {
                    ctx.set_status_at(stage_id, StageStatus::Succeeded, at)?;
                    ctx.record_output(stage_id, StageOutcome::Output(output))?;
                    transitions.push(StageTransition {
                        stage: stage_id.clone(),
                        from: StageStatus::Running,
                        to: StageStatus::Succeeded,
                    });
                }
                Err(error) => {
                    warn!(stage = %stage_id, %error, "stage failed");
                    ctx.set_status_at(stage_id, StageStatus::Failed, at)?;
                    ctx.record_output(stage_id, StageOutcome::Error(error))?;
                    transitions.push(StageTransition {
                        stage: stage_id.clone(),
                        from: StageStatus::Running,
                        to: StageStatus::Failed,
                    });
                    self.skip_dependents(ctx, plan, stage_id, &mut transitions)?;
                }
            }
        }

        if cancelled {
            self.skip_cancelled(ctx, &mut transitions)?;
        }

        let status = run_status(ctx);
        info!(%status, "wave finished");

        Ok(StepResult {
            wave: Some(wave),
            transitions,
            status,
        })
    }

    /// Mark every pending transitive dependent of a failed stage as skipped
    fn skip_dependents(
        &self,
        ctx: &mut ExecutionContext,
        plan: &ExecutionPlan,
        failed: &str,
        transitions: &mut Vec<StageTransition>,
    ) -> PipesimResult<()> {
        let mut skipped = Vec::new();

        for dependent in plan.graph().transitive_dependents(failed) {
            if ctx.status(dependent) != Some(StageStatus::Pending) {
                continue;
            }

            ctx.set_status(dependent, StageStatus::Skipped)?;
            ctx.record_output(
                dependent,
                StageOutcome::Skipped(SkipReason::UpstreamFailed {
                    stage: failed.to_string(),
                }),
            )?;
            transitions.push(StageTransition {
                stage: dependent.to_string(),
                from: StageStatus::Pending,
                to: StageStatus::Skipped,
            });
            skipped.push(dependent);
        }

        if !skipped.is_empty() {
            warn!(stage = %failed, skipped = ?skipped, "skipping dependents of failed stage");
        }

        Ok(())
    }

    /// Mark every stage that has not started as skipped by cancellation
    fn skip_cancelled(
        &self,
        ctx: &mut ExecutionContext,
        transitions: &mut Vec<StageTransition>,
    ) -> PipesimResult<()> {
        let pending: Vec<String> = ctx
            .stages_with(StageStatus::Pending)
            .into_iter()
            .map(String::from)
            .collect();

        warn!(skipped = pending.len(), "run cancelled");

        for stage_id in pending {
            ctx.set_status(&stage_id, StageStatus::Skipped)?;
            ctx.record_output(&stage_id, StageOutcome::Skipped(SkipReason::Cancelled))?;
            transitions.push(StageTransition {
                stage: stage_id,
                from: StageStatus::Pending,
                to: StageStatus::Skipped,
            });
        }

        Ok(())
    }

    /// Advance until the context is terminal
    pub async fn run(&self, ctx: &mut ExecutionContext) -> PipesimResult<RunSummary> {
        let span = info_span!("run", pipeline = %ctx.pipeline().id, run_id = %ctx.run_id());

        async {
            while !ctx.is_terminal() {
                self.advance(ctx).await?;
            }

            let summary = summarize(ctx);
            info!(status = %summary.status, "run finished");
            Ok::<_, PipesimError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Start a run of `plan` and drive it to completion
    pub async fn execute(
        &self,
        plan: impl Into<Arc<ExecutionPlan>>,
    ) -> PipesimResult<ExecutionContext> {
        let mut ctx = self.start(plan)?;
        self.run(&mut ctx).await?;
        Ok(ctx)
    }
}
