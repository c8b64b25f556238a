// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Execution context
//!
//! Run-time state of one pipeline run. The scheduler is the only writer;
//! every write goes through [`ExecutionContext::set_status`], which enforces
//! the forward-only status law.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ExecutionError, PipesimError, PipesimResult};
use crate::pipeline::{ExecutionPlan, PipelineDefinition, StageDefinition};
use crate::runner::StageOutput;

/// Status of a single stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Whether `self → next` is a legal forward move
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Why a stage never ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A (transitive) dependency failed
    UpstreamFailed { stage: String },
    /// The run was cancelled before the stage started
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpstreamFailed { stage } => write!(f, "upstream stage '{}' failed", stage),
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

/// What a stage produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Output(StageOutput),
    Error(ExecutionError),
    Skipped(SkipReason),
}

/// Per-stage run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRunState {
    pub status: StageStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StageOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl StageRunState {
    fn pending() -> Self {
        Self {
            status: StageStatus::Pending,
            started_at: None,
            ended_at: None,
            output: None,
            error: None,
            skip_reason: None,
        }
    }
}

/// Serializable view of a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub pipeline_id: String,
    pub run_id: Uuid,
    pub stages: BTreeMap<String, StageRunState>,
}

/// State of one in-flight pipeline run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: Uuid,
    plan: Arc<ExecutionPlan>,
    states: HashMap<String, StageRunState>,
}

impl ExecutionContext {
    /// Fresh context with every stage pending
    pub(crate) fn new(plan: Arc<ExecutionPlan>) -> Self {
        let states = plan
            .graph()
            .stages()
            .map(|s| (s.id.clone(), StageRunState::pending()))
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            plan,
            states,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn plan(&self) -> &Arc<ExecutionPlan> {
        &self.plan
    }

    pub fn pipeline(&self) -> &Arc<PipelineDefinition> {
        self.plan.graph().pipeline()
    }

    /// State of a stage
    pub fn state(&self, stage_id: &str) -> Option<&StageRunState> {
        self.states.get(stage_id)
    }

    /// Status of a stage
    pub fn status(&self, stage_id: &str) -> Option<StageStatus> {
        self.states.get(stage_id).map(|s| s.status)
    }

    /// Stages with their state, in declaration order
    pub fn stages(&self) -> impl Iterator<Item = (&StageDefinition, &StageRunState)> {
        self.plan
            .graph()
            .stages()
            .filter_map(|s| self.states.get(&s.id).map(|state| (s, state)))
    }

    /// Ids of stages currently in `status`, in declaration order
    pub fn stages_with(&self, status: StageStatus) -> Vec<&str> {
        self.stages()
            .filter(|(_, state)| state.status == status)
            .map(|(s, _)| s.id.as_str())
            .collect()
    }

    /// True when every stage is succeeded, failed or skipped
    pub fn is_terminal(&self) -> bool {
        self.states.values().all(|s| s.status.is_terminal())
    }

    /// True once any stage has left `pending`
    pub fn has_started(&self) -> bool {
        self.states
            .values()
            .any(|s| s.status != StageStatus::Pending)
    }

    /// Move a stage forward, stamping start/end times
    pub(crate) fn set_status(&mut self, stage_id: &str, status: StageStatus) -> PipesimResult<()> {
        self.set_status_at(stage_id, status, Utc::now())
    }

    /// Like [`set_status`](Self::set_status) with an explicit timestamp
    pub(crate) fn set_status_at(
        &mut self,
        stage_id: &str,
        status: StageStatus,
        at: DateTime<Utc>,
    ) -> PipesimResult<()> {
        let state = self
            .states
            .get_mut(stage_id)
            .ok_or_else(|| PipesimError::StageNotFound {
                stage: stage_id.to_string(),
            })?;

        if !state.status.can_transition_to(status) {
            return Err(PipesimError::InvalidTransition {
                stage: stage_id.to_string(),
                from: state.status,
                to: status,
            });
        }

        debug!(stage = stage_id, from = %state.status, to = %status, "stage transition");

        if status == StageStatus::Running {
            state.started_at = Some(at);
        }
        if status.is_terminal() {
            state.ended_at = Some(at);
        }
        state.status = status;

        Ok(())
    }

    /// Attach what a stage produced
    pub(crate) fn record_output(&mut self, stage_id: &str, outcome: StageOutcome) -> PipesimResult<()> {
        let state = self
            .states
            .get_mut(stage_id)
            .ok_or_else(|| PipesimError::StageNotFound {
                stage: stage_id.to_string(),
            })?;

        match outcome {
            StageOutcome::Output(output) => state.output = Some(output),
            StageOutcome::Error(error) => state.error = Some(error),
            StageOutcome::Skipped(reason) => state.skip_reason = Some(reason),
        }

        Ok(())
    }

    /// Serializable copy of the current state
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            pipeline_id: self.pipeline().id.clone(),
            run_id: self.run_id,
            stages: self
                .states
                .iter()
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect(),
        }
    }
}
