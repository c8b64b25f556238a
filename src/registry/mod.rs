// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Pipeline and artifact registry
//!
//! Insertion-ordered, in-memory store. Entries are immutable once
//! registered; pipelines are handed out as shared `Arc`s so runs never copy
//! a definition.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{PipesimError, PipesimResult};
use crate::pipeline::{Artifact, ArtifactKind, PipelineDefinition};

/// Registry of pipelines and artifacts
#[derive(Debug, Default, Clone)]
pub struct Registry {
    pipelines: Vec<Arc<PipelineDefinition>>,
    pipeline_index: HashMap<String, usize>,
    artifacts: Vec<Artifact>,
    artifact_index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline under its id
    pub fn register_pipeline(
        &mut self,
        pipeline: PipelineDefinition,
    ) -> PipesimResult<Arc<PipelineDefinition>> {
        if self.pipeline_index.contains_key(&pipeline.id) {
            return Err(PipesimError::PipelineAlreadyRegistered { id: pipeline.id });
        }

        debug!(pipeline = %pipeline.id, stages = pipeline.stages.len(), "registered pipeline");

        let pipeline = Arc::new(pipeline);
        self.pipeline_index
            .insert(pipeline.id.clone(), self.pipelines.len());
        self.pipelines.push(Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Look up a pipeline
    pub fn get_pipeline(&self, id: &str) -> PipesimResult<Arc<PipelineDefinition>> {
        self.pipeline_index
            .get(id)
            .map(|idx| Arc::clone(&self.pipelines[*idx]))
            .ok_or_else(|| PipesimError::PipelineNotFound { id: id.to_string() })
    }

    /// Pipelines in registration order
    pub fn pipelines(&self) -> &[Arc<PipelineDefinition>] {
        &self.pipelines
    }

    /// Store an artifact under its id
    pub fn add_artifact(&mut self, artifact: Artifact) -> PipesimResult<()> {
        if self.artifact_index.contains_key(&artifact.id) {
            return Err(PipesimError::ArtifactAlreadyRegistered { id: artifact.id });
        }

        debug!(artifact = %artifact.id, kind = %artifact.kind, "stored artifact");

        self.artifact_index
            .insert(artifact.id.clone(), self.artifacts.len());
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Look up an artifact
    pub fn get_artifact(&self, id: &str) -> PipesimResult<&Artifact> {
        self.artifact_index
            .get(id)
            .map(|idx| &self.artifacts[*idx])
            .ok_or_else(|| PipesimError::ArtifactNotFound { id: id.to_string() })
    }

    /// Artifacts in insertion order
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Artifacts of one kind, in insertion order
    pub fn artifacts_of_kind(&self, kind: ArtifactKind) -> Vec<&Artifact> {
        self.artifacts.iter().filter(|a| a.kind == kind).collect()
    }
}
