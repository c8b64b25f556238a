// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Manifest configuration
//!
//! A manifest declares runner settings, pipelines and artifacts. YAML is the
//! default; JSON and TOML are picked by file extension.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{PipesimError, PipesimResult};
use crate::pipeline::{Artifact, PipelineDefinition};
use crate::registry::Registry;
use crate::runner::RetryPolicy;

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = ".pipesim.yaml";

/// Top-level manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Pipelines in declaration order
    #[serde(default)]
    pub pipelines: Vec<PipelineDefinition>,

    /// Stored artifacts
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Shell used to run stage scripts
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Working directory for stage scripts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Default per-stage timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Cap on concurrently running stages within a wave
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Extra environment for stage scripts
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Retry policy applied to every stage
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_shell() -> String {
    "bash".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            working_dir: None,
            timeout_secs: None,
            max_parallel: None,
            env: HashMap::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Manifest {
    /// Load a manifest, choosing the format from the file extension
    pub fn load(path: &Path) -> PipesimResult<Self> {
        if !path.exists() {
            return Err(PipesimError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PipesimError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(PipesimError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Parse a YAML manifest
    pub fn from_yaml(yaml: &str) -> PipesimResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Register every pipeline and artifact, returning the runner settings
    /// alongside the registry
    pub fn into_registry(self) -> PipesimResult<(RunnerConfig, Registry)> {
        let mut registry = Registry::new();

        for pipeline in self.pipelines {
            registry.register_pipeline(pipeline)?;
        }
        for artifact in self.artifacts {
            registry.add_artifact(artifact)?;
        }

        Ok((self.runner, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ArtifactKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"
runner:
  shell: sh
  timeout_secs: 60
  max_parallel: 2
  env:
    DEPLOY_ENV: staging
  retry:
    max_attempts: 3
pipelines:
  - id: my-pipeline
    name: My Pipeline
    stages:
      - id: src
        name: Source
        type: source
        script: git clone https://github.com/my-repo.git
      - id: build
        name: Build
        type: build
        dependencies: [src]
        script: npm run build
artifacts:
  - id: bin
    name: Binary
    type: binary
"#;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();

        assert_eq!(manifest.runner.shell, "sh");
        assert_eq!(manifest.runner.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(manifest.runner.max_parallel, Some(2));
        assert_eq!(manifest.runner.retry.max_attempts, 3);
        assert_eq!(manifest.runner.retry.backoff_ms, 500);
        assert_eq!(manifest.pipelines[0].stages.len(), 2);
        assert_eq!(manifest.artifacts[0].kind, ArtifactKind::Binary);
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let manifest = Manifest::from_yaml("pipelines: []").unwrap();

        assert_eq!(manifest.runner, RunnerConfig::default());
        assert!(manifest.artifacts.is_empty());
    }

    #[test]
    fn test_load_by_extension() {
        let yaml = write_temp(".yml", MANIFEST);
        assert_eq!(Manifest::load(yaml.path()).unwrap().pipelines.len(), 1);

        let json = write_temp(
            ".json",
            r#"{"pipelines":[{"id":"p","name":"P","stages":[{"id":"a","name":"A","type":"test"}]}]}"#,
        );
        assert_eq!(Manifest::load(json.path()).unwrap().pipelines[0].id, "p");

        let toml = write_temp(
            ".toml",
            "[runner]\nshell = \"zsh\"\n\n[[pipelines]]\nid = \"p\"\nname = \"P\"\n",
        );
        let manifest = Manifest::load(toml.path()).unwrap();
        assert_eq!(manifest.runner.shell, "zsh");
        assert!(manifest.pipelines[0].stages.is_empty());
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            Manifest::load(Path::new("/definitely/not/here.yaml")),
            Err(PipesimError::ManifestNotFound { .. })
        ));

        let ini = write_temp(".ini", "x=1");
        assert!(matches!(
            Manifest::load(ini.path()),
            Err(PipesimError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_into_registry() {
        let (runner, registry) = Manifest::from_yaml(MANIFEST).unwrap().into_registry().unwrap();

        assert_eq!(runner.env["DEPLOY_ENV"], "staging");
        assert_eq!(registry.get_pipeline("my-pipeline").unwrap().name, "My Pipeline");
        assert!(registry.get_artifact("bin").is_ok());
    }

    #[test]
    fn test_duplicate_pipeline_ids_rejected() {
        let manifest = Manifest::from_yaml(
            "pipelines:\n  - {id: p, name: One}\n  - {id: p, name: Two}\n",
        )
        .unwrap();

        assert!(matches!(
            manifest.into_registry(),
            Err(PipesimError::PipelineAlreadyRegistered { .. })
        ));
    }
}
