// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Run status reporting
//!
//! Pure views over an [`ExecutionContext`]. Nothing here mutates state, so
//! calling any of these twice on the same context yields the same answer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::context::SkipReason;
use crate::pipeline::{ExecutionContext, StageStatus};

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// No stage has started yet
    Pending,
    /// Some stages are not terminal
    Running,
    /// Every stage succeeded
    Succeeded,
    /// Every leaf stage failed or was skipped because of a failure
    Failed,
    /// Some stages failed but at least one leaf still succeeded
    PartiallyFailed,
    /// The run was cancelled before every stage could run
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::PartiallyFailed => write!(f, "partially-failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Number of stages per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn get(&self, status: StageStatus) -> usize {
        match status {
            StageStatus::Pending => self.pending,
            StageStatus::Running => self.running,
            StageStatus::Succeeded => self.succeeded,
            StageStatus::Failed => self.failed,
            StageStatus::Skipped => self.skipped,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.succeeded + self.failed + self.skipped
    }

    fn bump(&mut self, status: StageStatus) {
        match status {
            StageStatus::Pending => self.pending += 1,
            StageStatus::Running => self.running += 1,
            StageStatus::Succeeded => self.succeeded += 1,
            StageStatus::Failed => self.failed += 1,
            StageStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Aggregate view of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub pipeline_id: String,
    pub run_id: Uuid,
    pub status: RunStatus,
    pub counts: StatusCounts,
    /// Stages currently running, in declaration order
    pub running: Vec<String>,
    /// Stages that failed, in declaration order
    pub failed: Vec<String>,
    /// Stages that were skipped, in declaration order
    pub skipped: Vec<String>,
    /// 1-based number of the next wave with pending stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_wave: Option<usize>,
    pub total_waves: usize,
}

/// Summarize a context
pub fn summarize(ctx: &ExecutionContext) -> RunSummary {
    let mut counts = StatusCounts::default();
    for (_, state) in ctx.stages() {
        counts.bump(state.status);
    }

    let owned = |status: StageStatus| {
        ctx.stages_with(status)
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    };

    RunSummary {
        pipeline_id: ctx.pipeline().id.clone(),
        run_id: ctx.run_id(),
        status: run_status(ctx),
        counts,
        running: owned(StageStatus::Running),
        failed: owned(StageStatus::Failed),
        skipped: owned(StageStatus::Skipped),
        next_wave: next_wave(ctx).map(|w| w + 1),
        total_waves: ctx.plan().wave_count(),
    }
}

/// First wave that still has a pending stage (0-based)
fn next_wave(ctx: &ExecutionContext) -> Option<usize> {
    ctx.plan().waves().iter().position(|wave| {
        wave.iter()
            .any(|id| ctx.status(id) == Some(StageStatus::Pending))
    })
}

/// Overall status of a run
pub fn run_status(ctx: &ExecutionContext) -> RunStatus {
    if !ctx.has_started() {
        return RunStatus::Pending;
    }
    if !ctx.is_terminal() {
        return RunStatus::Running;
    }

    let any_failed = ctx
        .stages()
        .any(|(_, state)| state.status == StageStatus::Failed);

    if !any_failed {
        let cancelled = ctx
            .stages()
            .any(|(_, state)| state.skip_reason == Some(SkipReason::Cancelled));
        return if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Succeeded
        };
    }

    let all_leaves_lost = ctx.plan().graph().leaves().into_iter().all(|leaf| {
        ctx.state(leaf).is_some_and(|state| {
            state.status == StageStatus::Failed
                || matches!(state.skip_reason, Some(SkipReason::UpstreamFailed { .. }))
        })
    });

    if all_leaves_lost {
        RunStatus::Failed
    } else {
        RunStatus::PartiallyFailed
    }
}

/// One human-readable line describing where a run is
pub fn status_line(ctx: &ExecutionContext) -> String {
    match run_status(ctx) {
        RunStatus::Succeeded => return "Pipeline completed".to_string(),
        RunStatus::Failed => return "Pipeline failed".to_string(),
        RunStatus::PartiallyFailed => return "Pipeline partially failed".to_string(),
        RunStatus::Cancelled => return "Pipeline cancelled".to_string(),
        RunStatus::Pending | RunStatus::Running => {}
    }

    let running = names_with(ctx, StageStatus::Running);
    if !running.is_empty() {
        return describe("Running", &running);
    }

    // Between waves: point at what runs next
    let next = next_wave(ctx)
        .and_then(|w| ctx.plan().wave(w))
        .unwrap_or_default()
        .into_iter()
        .filter(|id| ctx.status(id) == Some(StageStatus::Pending))
        .filter_map(|id| ctx.plan().graph().stage(id))
        .map(|s| s.name.clone())
        .collect::<Vec<_>>();

    describe("Waiting to run", &next)
}

fn names_with(ctx: &ExecutionContext, status: StageStatus) -> Vec<String> {
    ctx.stages()
        .filter(|(_, state)| state.status == status)
        .map(|(stage, _)| stage.name.clone())
        .collect()
}

fn describe(verb: &str, names: &[String]) -> String {
    match names {
        [] => format!("{} nothing", verb),
        [one] => format!("{} stage {}", verb, one),
        many => format!("{} stages {}", verb, many.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::StageOutcome;
    use crate::pipeline::dag::tests::make_test_pipeline;
    use crate::pipeline::{Scheduler, StageGraph};
    use std::sync::Arc;

    fn context(stages: Vec<(&str, Vec<&str>)>) -> ExecutionContext {
        let plan = Scheduler::plan(StageGraph::build(make_test_pipeline(stages)).unwrap());
        ExecutionContext::new(Arc::new(plan))
    }

    fn finish(ctx: &mut ExecutionContext, id: &str, status: StageStatus) {
        ctx.set_status(id, StageStatus::Running).unwrap();
        ctx.set_status(id, status).unwrap();
    }

    fn skip(ctx: &mut ExecutionContext, id: &str, reason: SkipReason) {
        ctx.set_status(id, StageStatus::Skipped).unwrap();
        ctx.record_output(id, StageOutcome::Skipped(reason)).unwrap();
    }

    #[test]
    fn test_fresh_run_is_pending() {
        let ctx = context(vec![("src", vec![]), ("build", vec!["src"])]);

        let summary = summarize(&ctx);
        assert_eq!(summary.status, RunStatus::Pending);
        assert_eq!(summary.counts.pending, 2);
        assert_eq!(summary.next_wave, Some(1));
        assert_eq!(summary.total_waves, 2);
        assert_eq!(status_line(&ctx), "Waiting to run stage src");
    }

    #[test]
    fn test_running_line_names_every_running_stage() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec![]), ("c", vec!["a"])]);
        ctx.set_status("a", StageStatus::Running).unwrap();
        ctx.set_status("b", StageStatus::Running).unwrap();

        assert_eq!(run_status(&ctx), RunStatus::Running);
        assert_eq!(status_line(&ctx), "Running stages a, b");
        assert_eq!(summarize(&ctx).running, vec!["a", "b"]);
    }

    #[test]
    fn test_between_waves_points_at_next() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Succeeded);

        assert_eq!(status_line(&ctx), "Waiting to run stage b");
        assert_eq!(summarize(&ctx).next_wave, Some(2));
    }

    #[test]
    fn test_completed() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Succeeded);
        finish(&mut ctx, "b", StageStatus::Succeeded);

        let summary = summarize(&ctx);
        assert_eq!(summary.status, RunStatus::Succeeded);
        assert_eq!(summary.counts.get(StageStatus::Succeeded), 2);
        assert_eq!(summary.next_wave, None);
        assert_eq!(status_line(&ctx), "Pipeline completed");
    }

    #[test]
    fn test_all_leaves_lost_is_failed() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Failed);
        let upstream = SkipReason::UpstreamFailed { stage: "a".into() };
        skip(&mut ctx, "b", upstream.clone());
        skip(&mut ctx, "c", upstream);

        let summary = summarize(&ctx);
        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(summary.failed, vec!["a"]);
        assert_eq!(summary.skipped, vec!["b", "c"]);
        assert_eq!(status_line(&ctx), "Pipeline failed");
    }

    #[test]
    fn test_surviving_leaf_is_partial() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Succeeded);
        finish(&mut ctx, "b", StageStatus::Failed);
        finish(&mut ctx, "c", StageStatus::Succeeded);

        assert_eq!(run_status(&ctx), RunStatus::PartiallyFailed);
        assert_eq!(status_line(&ctx), "Pipeline partially failed");
    }

    #[test]
    fn test_cancelled_without_failures() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Succeeded);
        skip(&mut ctx, "b", SkipReason::Cancelled);

        assert_eq!(run_status(&ctx), RunStatus::Cancelled);
        assert_eq!(status_line(&ctx), "Pipeline cancelled");
    }

    #[test]
    fn test_reporting_is_idempotent() {
        let mut ctx = context(vec![("a", vec![]), ("b", vec!["a"])]);
        finish(&mut ctx, "a", StageStatus::Failed);
        let before = ctx.snapshot();

        assert_eq!(summarize(&ctx), summarize(&ctx));
        assert_eq!(status_line(&ctx), status_line(&ctx));
        assert_eq!(ctx.snapshot(), before);
    }

    #[test]
    fn test_summary_json_shape() {
        let mut ctx = context(vec![("a", vec![])]);
        finish(&mut ctx, "a", StageStatus::Failed);

        let json = serde_json::to_value(summarize(&ctx)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["counts"]["failed"], 1);
        assert!(json.get("next_wave").is_none());
    }
}
