// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Retrying runner
//!
//! Retries are a runner concern: the scheduler sees one final `Result` per
//! stage, however many attempts it took.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::{Runner, StageOutput};
use crate::errors::ExecutionError;
use crate::pipeline::StageDefinition;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Factor applied to the delay after each failed attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound for a single delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Whether a timed out attempt is retried
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_on_timeout: default_true(),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }

    fn should_retry(&self, error: &ExecutionError, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.retry_on_timeout || !error.is_timeout())
    }
}

/// Runner decorator that retries failed attempts with exponential backoff
pub struct RetryRunner<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: Runner> RetryRunner<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<R: Runner> Runner for RetryRunner<R> {
    async fn execute(&self, stage: &StageDefinition) -> Result<StageOutput, ExecutionError> {
        let mut attempt = 1;

        loop {
            match self.inner.execute(stage).await {
                Ok(mut output) => {
                    output.attempts = attempt;
                    return Ok(output);
                }
                Err(error) if self.policy.should_retry(&error, attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        stage = %stage.id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "stage attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn name(&self) -> &str {
        "retry"
    }
}
