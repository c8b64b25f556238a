// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Shell runner
//!
//! Executes stage scripts with `<shell> -c <script>`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use super::{Runner, StageOutput};
use crate::errors::ExecutionError;
use crate::pipeline::StageDefinition;

/// Shell runner
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ShellRunner {
    /// Create a new shell runner using bash in the current directory
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
            working_dir: PathBuf::from("."),
            env: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Default timeout for stages that don't set their own
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for ShellRunner {
    async fn execute(&self, stage: &StageDefinition) -> Result<StageOutput, ExecutionError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&stage.script);
        cmd.current_dir(&self.working_dir);
        cmd.envs(&self.env);
        cmd.env("PIPESIM_STAGE_ID", &stage.id);
        cmd.env("PIPESIM_STAGE_KIND", stage.kind.to_string());
        // Dropping the output future on timeout must take the child with it
        cmd.kill_on_drop(true);

        debug!(stage = %stage.id, shell = %self.shell, "spawning stage script");

        let result = match stage.timeout().or(self.timeout) {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ExecutionError::Timeout {
                        limit_ms: limit.as_millis() as u64,
                    })
                }
            },
            None => cmd.output().await,
        };

        let output = result.map_err(|e| {
            ExecutionError::failed(format!("failed to spawn shell '{}': {}", self.shell, e))
        })?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(StageOutput {
                stdout,
                stderr,
                exit_code: Some(0),
                duration_ms: duration.as_millis() as u64,
                attempts: 1,
            })
        } else {
            let exit_code = output.status.code();
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            let message = match stderr.trim() {
                "" => format!("script exited with {}", code),
                err => format!("script exited with {}: {}", code, err),
            };

            Err(ExecutionError::Failed { message, exit_code })
        }
    }

    fn name(&self) -> &str {
        "shell"
    }
}
