// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Simulated runner
//!
//! Pretends to run stages. Every stage succeeds unless an outcome was
//! configured for it, which makes runs reproducible without touching the
//! machine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{Runner, StageOutput};
use crate::errors::ExecutionError;
use crate::pipeline::StageDefinition;

/// Scripted result for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOutcome {
    Succeed,
    Fail(String),
    /// Fail the first `n` attempts, then succeed
    FailTimes(u32, String),
    Timeout(Duration),
}

/// Simulated runner
#[derive(Debug, Default)]
pub struct SimulatedRunner {
    outcomes: HashMap<String, SimulatedOutcome>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl SimulatedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome of a stage
    pub fn with_outcome(mut self, stage_id: impl Into<String>, outcome: SimulatedOutcome) -> Self {
        self.outcomes.insert(stage_id.into(), outcome);
        self
    }

    /// Make a stage fail
    pub fn failing(self, stage_id: impl Into<String>) -> Self {
        self.with_outcome(stage_id, SimulatedOutcome::Fail("simulated failure".into()))
    }

    /// Artificial per-stage latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stage ids in the order they were executed, one entry per attempt
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record_call(&self, stage_id: &str) -> u32 {
        match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(stage_id.to_string());
                calls.iter().filter(|c| *c == stage_id).count() as u32
            }
            Err(_) => 1,
        }
    }
}

#[async_trait]
impl Runner for SimulatedRunner {
    async fn execute(&self, stage: &StageDefinition) -> Result<StageOutput, ExecutionError> {
        let attempt = self.record_call(&stage.id);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = self
            .outcomes
            .get(&stage.id)
            .unwrap_or(&SimulatedOutcome::Succeed);

        match outcome {
            SimulatedOutcome::Fail(message) => Err(ExecutionError::failed(message.clone())),
            SimulatedOutcome::FailTimes(times, message) if attempt <= *times => {
                Err(ExecutionError::failed(message.clone()))
            }
            SimulatedOutcome::Timeout(limit) => Err(ExecutionError::Timeout {
                limit_ms: limit.as_millis() as u64,
            }),
            SimulatedOutcome::Succeed | SimulatedOutcome::FailTimes(..) => {
                Ok(StageOutput {
                    duration_ms: self.delay.as_millis() as u64,
                    ..StageOutput::new(format!(
                        "simulated {} stage '{}': {}",
                        stage.kind, stage.id, stage.script
                    ))
                })
            }
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
