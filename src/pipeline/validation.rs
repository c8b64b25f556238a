// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Pipeline validation
//!
//! Collects every problem in a pipeline at once, unlike
//! [`StageGraph::build`] which stops at the first one.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::ValidationError;
use crate::pipeline::{PipelineDefinition, StageGraph};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline definition
    pub fn validate(pipeline: &PipelineDefinition) -> ValidationReport {
        let mut report = ValidationReport::default();

        if pipeline.stages.is_empty() {
            report.errors.push(ValidationError::EmptyPipeline {
                pipeline: pipeline.id.clone(),
            });
            return report;
        }

        let mut seen = HashSet::new();
        for stage in &pipeline.stages {
            if !seen.insert(stage.id.as_str()) {
                report.errors.push(ValidationError::DuplicateStageId {
                    stage: stage.id.clone(),
                });
            }
        }

        for stage in &pipeline.stages {
            let mut deps = HashSet::new();

            for dep in &stage.dependencies {
                if !deps.insert(dep.as_str()) {
                    report.warnings.push(format!(
                        "Stage '{}' lists dependency '{}' more than once",
                        stage.id, dep
                    ));
                }
                if dep != &stage.id && !seen.contains(dep.as_str()) {
                    report.errors.push(ValidationError::UnknownDependency {
                        stage: stage.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            if stage.script.trim().is_empty() {
                report
                    .warnings
                    .push(format!("Stage '{}' has an empty script", stage.id));
            }
        }

        // Cycles are only meaningful once ids and references are sound
        if report.errors.is_empty() {
            if let Err(e) = StageGraph::build(Arc::new(pipeline.clone())) {
                report.errors.push(e);
            }
        }

        report
    }
}

/// Result of pipeline validation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{StageDefinition, StageKind};

    fn stage(id: &str, deps: &[&str]) -> StageDefinition {
        StageDefinition::new(id, StageKind::Build, "make").depends_on(deps.iter().copied())
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let report = PipelineValidator::validate(&PipelineDefinition::new("empty", "Empty"));

        assert!(!report.is_valid());
        assert_eq!(
            report.errors,
            vec![ValidationError::EmptyPipeline {
                pipeline: "empty".into()
            }]
        );
    }

    #[test]
    fn test_collects_every_problem() {
        let pipeline = PipelineDefinition::new("p", "P")
            .with_stage(stage("a", &["ghost"]))
            .with_stage(stage("a", &[]))
            .with_stage(stage("b", &["phantom"]));

        let report = PipelineValidator::validate(&pipeline);

        assert_eq!(report.errors.len(), 3);
        assert!(report
            .errors
            .contains(&ValidationError::DuplicateStageId { stage: "a".into() }));
        assert!(report.errors.contains(&ValidationError::UnknownDependency {
            stage: "b".into(),
            dependency: "phantom".into(),
        }));
    }

    #[test]
    fn test_reports_cycle() {
        let pipeline = PipelineDefinition::new("p", "P")
            .with_stage(stage("a", &["b"]))
            .with_stage(stage("b", &["a"]));

        let report = PipelineValidator::validate(&pipeline);

        assert_eq!(
            report.errors,
            vec![ValidationError::CycleDetected {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let pipeline = PipelineDefinition::new("p", "P")
            .with_stage(StageDefinition::new("a", StageKind::Source, "  "))
            .with_stage(stage("b", &["a", "a"]));

        let report = PipelineValidator::validate(&pipeline);

        assert!(report.is_valid());
        assert!(report.has_warnings());
        assert_eq!(report.warnings.len(), 2);
    }
}
