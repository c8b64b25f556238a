// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Error types
//!
//! Three layers: [`ValidationError`] for structural problems caught before a
//! run starts, [`ExecutionError`] for stage outcomes reported by a runner, and
//! [`PipesimError`] for everything the crate surfaces to callers.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::StageStatus;

/// Result type for pipesim operations
pub type PipesimResult<T> = Result<T, PipesimError>;

/// Structural problems in a pipeline definition.
///
/// Raised by graph building and by `Scheduler::start`; never retried.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    #[diagnostic(
        code(pipesim::unknown_dependency),
        help("Check that '{dependency}' is defined in the same pipeline")
    )]
    UnknownDependency { stage: String, dependency: String },

    #[error("Circular dependency detected: {}", .cycle.join(" → "))]
    #[diagnostic(
        code(pipesim::cycle_detected),
        help("Review your stage dependencies to remove the cycle")
    )]
    CycleDetected { cycle: Vec<String> },

    #[error("Stage id '{stage}' is declared more than once")]
    #[diagnostic(
        code(pipesim::duplicate_stage_id),
        help("Stage ids must be unique within a pipeline")
    )]
    DuplicateStageId { stage: String },

    #[error("Pipeline '{pipeline}' has no stages")]
    #[diagnostic(
        code(pipesim::empty_pipeline),
        help("Add at least one stage before starting a run")
    )]
    EmptyPipeline { pipeline: String },
}

/// Failure reported by a runner for a single stage attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("{message}")]
    Failed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    #[error("timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },
}

impl ExecutionError {
    /// Generic failure without an exit code
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Main error type for pipesim
#[derive(Error, Debug, Diagnostic)]
pub enum PipesimError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    // ─────────────────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline '{id}' not found")]
    #[diagnostic(
        code(pipesim::pipeline_not_found),
        help("Run 'pipesim list' to see registered pipelines")
    )]
    PipelineNotFound { id: String },

    #[error("Pipeline '{id}' is already registered")]
    #[diagnostic(
        code(pipesim::pipeline_already_registered),
        help("Registered pipelines are immutable; use a new id instead")
    )]
    PipelineAlreadyRegistered { id: String },

    #[error("Artifact '{id}' not found")]
    #[diagnostic(code(pipesim::artifact_not_found))]
    ArtifactNotFound { id: String },

    #[error("Artifact '{id}' is already registered")]
    #[diagnostic(code(pipesim::artifact_already_registered))]
    ArtifactAlreadyRegistered { id: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Run Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' not found in pipeline")]
    #[diagnostic(code(pipesim::stage_not_found))]
    StageNotFound { stage: String },

    #[error("Stage '{stage}' cannot move from {from} to {to}")]
    #[diagnostic(
        code(pipesim::invalid_transition),
        help("Stage status only moves forward: pending → running → succeeded|failed, or pending → skipped")
    )]
    InvalidTransition {
        stage: String,
        from: StageStatus,
        to: StageStatus,
    },

    #[error("Internal scheduler error: {message}")]
    #[diagnostic(code(pipesim::internal))]
    Internal { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Manifest file not found: {path}")]
    #[diagnostic(
        code(pipesim::manifest_not_found),
        help("Create a .pipesim.yaml or pass another file with --file")
    )]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipesim::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Unsupported manifest format: {path}")]
    #[diagnostic(
        code(pipesim::unsupported_format),
        help("Supported extensions: .yaml, .yml, .json, .toml")
    )]
    UnsupportedFormat { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(pipesim::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipesim::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipesim::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipesim::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PipesimError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipesimError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipesimError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipesimError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipesimError {
    /// Recovery hint for errors that have an obvious fix
    pub fn suggestion(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::Validation(e) => Some(RecoverySuggestion::for_validation(e)),
            Self::ManifestNotFound { path } => Some(RecoverySuggestion::create_manifest(path)),
            _ => None,
        }
    }
}
