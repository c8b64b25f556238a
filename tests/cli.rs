// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = r#"
runner:
  shell: sh
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
      - id: deploy
        name: Deploy
        type: deploy
        dependencies: [build]
        script: deploy.sh
  - id: fan-out
    name: Fan Out
    stages:
      - id: a
        name: A
        type: source
        script: echo a
      - id: b
        name: B
        type: test
        dependencies: [a]
        script: echo b
      - id: c
        name: C
        type: test
        dependencies: [a]
        script: echo c
  - id: shell
    name: Shell
    stages:
      - id: hello
        name: Hello
        type: build
        script: echo hello
      - id: broken
        name: Broken
        type: test
        dependencies: [hello]
        script: exit 4
artifacts:
  - id: bin
    name: Binary
    type: binary
"#;

const CYCLIC: &str = r#"
pipelines:
  - id: loop
    name: Loop
    stages:
      - id: a
        name: A
        type: build
        dependencies: [b]
        script: make a
      - id: b
        name: B
        type: build
        dependencies: [a]
        script: make b
"#;

fn setup(manifest: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".pipesim.yaml"), manifest).unwrap();
    dir
}

fn pipesim(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pipesim").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("PIPESIM_MANIFEST")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_list_shows_pipelines_and_artifacts() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("my-pipeline"))
        .stdout(predicate::str::contains("(3 stages)"))
        .stdout(predicate::str::contains("bin"));
}

#[test]
fn test_plan_prints_waves() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["plan", "my-pipeline"])
        .assert()
        .success()
        .stdout("Wave 1: src\nWave 2: build\nWave 3: deploy\n");

    pipesim(&dir)
        .args(["plan", "fan-out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wave 2: b ∥ c (parallel)"));
}

#[test]
fn test_plan_json() {
    let dir = setup(MANIFEST);

    let output = pipesim(&dir)
        .args(["plan", "fan-out", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["waves"], serde_json::json!([["a"], ["b", "c"]]));
}

#[test]
fn test_graph_mermaid() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["graph", "my-pipeline", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph TD"))
        .stdout(predicate::str::contains("src --> build"));
}

#[test]
fn test_simulated_run_succeeds() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["run", "my-pipeline", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Waiting to run stage Build"))
        .stdout(predicate::str::contains("Waiting to run stage Deploy"))
        .stdout(predicate::str::contains("Pipeline completed"));
}

#[test]
fn test_simulated_failure_skips_downstream() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["run", "my-pipeline", "--fail", "build"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("build failed: simulated failure"))
        .stdout(predicate::str::contains(
            "deploy skipped (upstream stage 'build' failed)",
        ))
        .stdout(predicate::str::contains("Pipeline failed"));
}

#[test]
fn test_json_summary() {
    let dir = setup(MANIFEST);

    let output = pipesim(&dir)
        .args(["run", "fan-out", "--fail", "b", "--json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["status"], "partially-failed");
    assert_eq!(summary["counts"]["succeeded"], 2);
    assert_eq!(summary["failed"], serde_json::json!(["b"]));
}

#[test]
fn test_fail_flag_rejects_unknown_stage() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["run", "my-pipeline", "--fail", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stage 'nope' not found"));
}

#[test]
fn test_shell_run_reports_exit_code() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["run", "shell"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("hello succeeded"))
        .stdout(predicate::str::contains("broken failed: script exited with 4"));
}

#[test]
fn test_validate_reports_cycle() {
    let dir = setup(CYCLIC);

    pipesim(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Circular dependency detected: a → b → a",
        ));
}

#[test]
fn test_validate_all_valid() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["validate", "my-pipeline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All pipelines are valid!"));
}

#[test]
fn test_validate_counts_warnings() {
    let dir = setup(
        r#"
pipelines:
  - id: sloppy
    name: Sloppy
    stages:
      - id: a
        name: A
        type: build
        script: ""
"#,
    );

    pipesim(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 stages, no errors (1 warnings)"))
        .stdout(predicate::str::contains("Stage 'a' has an empty script"));
}

#[test]
fn test_unknown_pipeline() {
    let dir = setup(MANIFEST);

    pipesim(&dir)
        .args(["plan", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pipeline 'ghost' not found"));
}

#[test]
fn test_missing_manifest() {
    let dir = TempDir::new().unwrap();

    pipesim(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest file not found"));
}

#[test]
fn test_manifest_flag_and_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ci.yaml"), MANIFEST).unwrap();

    Command::cargo_bin("pipesim")
        .unwrap()
        .env("NO_COLOR", "1")
        .env_remove("PIPESIM_MANIFEST")
        .arg("-C")
        .arg(dir.path())
        .args(["--file", "ci.yaml", "plan", "my-pipeline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wave 3: deploy"));
}
