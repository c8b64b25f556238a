// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Plan command - show execution waves

use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::path::PathBuf;

use super::{load_registry, report, OutputFormat};
use crate::pipeline::{Scheduler, StageGraph};

/// Run the plan command
pub async fn run(manifest: PathBuf, pipeline: String, format: OutputFormat) -> Result<()> {
    let (_, registry) = load_registry(&manifest)?;
    let pipeline = registry.get_pipeline(&pipeline).map_err(report)?;

    let graph = StageGraph::build(pipeline).map_err(|e| report(e.into()))?;
    let plan = Scheduler::plan(graph);

    match format {
        OutputFormat::Text => println!("{}", plan.to_text()),
        OutputFormat::Json => {
            let value = json!({
                "pipeline": plan.pipeline().id,
                "waves": plan.waves(),
            });
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
    }

    Ok(())
}
