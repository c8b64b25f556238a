// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Stage runners
//!
//! The scheduler never executes a script itself. It hands each stage to a
//! [`Runner`] and only consumes the returned `Result`. How the script runs
//! (a shell process, a simulation) is up to the implementation.

mod retry;
mod shell;
mod simulated;

pub use retry::{RetryPolicy, RetryRunner};
pub use shell::ShellRunner;
pub use simulated::{SimulatedOutcome, SimulatedRunner};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RunnerConfig;
use crate::errors::ExecutionError;
use crate::pipeline::StageDefinition;

/// Output captured from a successful stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Standard output
    pub stdout: String,

    /// Standard error
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    /// Exit code, when the runner spawned a process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Wall time of the final attempt
    #[serde(default)]
    pub duration_ms: u64,

    /// Attempts it took to succeed
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_attempts() -> u32 {
    1
}

impl StageOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            attempts: 1,
            ..Self::default()
        }
    }
}

/// Trait for stage runners
#[async_trait]
pub trait Runner: Send + Sync {
    /// Execute one attempt of a stage
    async fn execute(&self, stage: &StageDefinition) -> Result<StageOutput, ExecutionError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Arc<R> {
    async fn execute(&self, stage: &StageDefinition) -> Result<StageOutput, ExecutionError> {
        (**self).execute(stage).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wrap a runner in the configured retry policy, if it allows more than one
/// attempt
pub fn with_retry(inner: Arc<dyn Runner>, policy: &RetryPolicy) -> Arc<dyn Runner> {
    if policy.max_attempts > 1 {
        Arc::new(RetryRunner::new(inner, policy.clone()))
    } else {
        inner
    }
}

/// Create the shell runner stack described by a runner config
pub fn build_runner(config: &RunnerConfig) -> Arc<dyn Runner> {
    let mut shell = ShellRunner::new()
        .with_shell(&config.shell)
        .with_env(config.env.clone());

    if let Some(dir) = &config.working_dir {
        shell = shell.with_working_dir(dir);
    }
    if let Some(timeout) = config.timeout() {
        shell = shell.with_timeout(timeout);
    }

    with_retry(Arc::new(shell), &config.retry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_runner_without_retry_is_shell() {
        let runner = build_runner(&RunnerConfig::default());
        assert_eq!(runner.name(), "shell");
    }

    #[test]
    fn test_build_runner_with_retry_wraps() {
        let config = RunnerConfig {
            retry: RetryPolicy::default().with_max_attempts(3),
            ..RunnerConfig::default()
        };

        let runner = build_runner(&config);
        assert_eq!(runner.name(), "retry");
    }

    #[test]
    fn test_output_attempts_default_when_missing() {
        let output: StageOutput = serde_json::from_str(r#"{"stdout":"ok"}"#).unwrap();
        assert_eq!(output.attempts, 1);
        assert_eq!(output, StageOutput::new("ok"));
    }
}
