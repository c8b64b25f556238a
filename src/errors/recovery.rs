// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use std::path::Path;

use super::{ExecutionError, ValidationError};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick the suggestion matching a validation error
    pub fn for_validation(error: &ValidationError) -> Self {
        match error {
            ValidationError::UnknownDependency { stage, dependency } => {
                Self::fix_unknown_dependency(stage, dependency)
            }
            ValidationError::CycleDetected { cycle } => Self::fix_cycle(cycle),
            ValidationError::DuplicateStageId { stage } => Self {
                action: format!("Rename one of the stages called '{}'", stage),
                steps: vec![
                    "Stage ids identify nodes in the dependency graph".into(),
                    "Give each stage a distinct id and update dependency lists".into(),
                ],
                commands: vec![],
            },
            ValidationError::EmptyPipeline { pipeline } => Self {
                action: format!("Add stages to pipeline '{}'", pipeline),
                steps: vec!["A run needs at least one stage to execute".into()],
                commands: vec![],
            },
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_cycle(cycle: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", cycle.join(" → ")),
                "Drop one of the dependency entries along this path".into(),
                "Ensure stages form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Inspect the graph:".into(),
                "pipesim graph <pipeline> --format mermaid".into(),
            ],
        }
    }

    /// Suggest fixing a reference to a stage that does not exist
    pub fn fix_unknown_dependency(stage: &str, dependency: &str) -> Self {
        Self {
            action: format!("Fix dependency '{}' of stage '{}'", dependency, stage),
            steps: vec![
                format!("Stage '{}' lists '{}' under dependencies", stage, dependency),
                "Either declare that stage or remove the entry".into(),
                "Dependencies may only reference stages of the same pipeline".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest creating a manifest file
    pub fn create_manifest(path: &Path) -> Self {
        Self {
            action: "Create a pipeline manifest".into(),
            steps: vec![
                format!("No manifest found at {}", path.display()),
                "Declare a runner section, pipelines and artifacts in YAML".into(),
            ],
            commands: vec![
                "# Point at an existing manifest:".into(),
                "pipesim --file demos/pipesim.yaml list".into(),
            ],
        }
    }

    /// Suggest next steps after a stage failed
    pub fn stage_failed(stage: &str, error: &ExecutionError, skipped: &[String]) -> Self {
        let mut steps = vec![format!("Stage '{}' failed: {}", stage, error)];

        if error.is_timeout() {
            steps.push("Raise runner.timeout_secs or the stage's timeout_secs".into());
        } else {
            steps.push("Re-run the stage script by hand to reproduce".into());
        }

        if !skipped.is_empty() {
            steps.push(format!("Skipped as a consequence: {}", skipped.join(", ")));
        }

        Self {
            action: format!("Fix stage '{}'", stage),
            steps,
            commands: vec![],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
