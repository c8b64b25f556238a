// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Graph command - visualize pipeline as a graph

use miette::Result;
use std::path::PathBuf;

use super::{load_registry, report, GraphFormat};
use crate::pipeline::StageGraph;

/// Run the graph command
pub async fn run(manifest: PathBuf, pipeline: String, format: GraphFormat) -> Result<()> {
    let (_, registry) = load_registry(&manifest)?;
    let pipeline = registry.get_pipeline(&pipeline).map_err(report)?;

    let graph = StageGraph::build(pipeline).map_err(|e| report(e.into()))?;

    let output = match format {
        GraphFormat::Text => graph.to_text(),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
