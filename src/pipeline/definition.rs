// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Pipeline definition structures
//!
//! Defines the schema for pipelines, stages and artifacts as they appear in
//! a manifest file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::PipesimError;

/// A pipeline: an id, a display name and its stages in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline id (unique within a registry)
    pub id: String,

    /// Display name
    pub name: String,

    /// Pipeline description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Stages in declaration order
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

impl PipelineDefinition {
    /// Create an empty pipeline
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn with_stage(mut self, stage: StageDefinition) -> Self {
        self.stages.push(stage);
        self
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, PipesimError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> Result<String, PipesimError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a stage by id
    pub fn get_stage(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Get all stage ids in declaration order
    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id.as_str()).collect()
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage id (must be unique within pipeline)
    pub id: String,

    /// Display name
    pub name: String,

    /// Stage kind
    #[serde(rename = "type")]
    pub kind: StageKind,

    /// Ids of stages that must succeed before this one runs
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,

    /// Command handed to the runner
    #[serde(default)]
    pub script: String,

    /// Per-stage timeout, overriding the runner default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StageDefinition {
    pub fn new(id: impl Into<String>, kind: StageKind, script: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            dependencies: Vec::new(),
            script: script.into(),
            timeout_secs: None,
        }
    }

    /// Set the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add dependencies
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Stage kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Fetch sources
    Source,
    /// Compile or package
    Build,
    /// Run checks
    Test,
    /// Ship to an environment
    Deploy,
    /// Publish a release
    Release,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
            Self::Deploy => write!(f, "deploy"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// A stored artifact; the payload is opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: ArtifactKind,

    #[serde(default)]
    pub data: String,
}

/// Artifact kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Binary,
    Config,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Binary => write!(f, "binary"),
            Self::Config => write!(f, "config"),
        }
    }
}
