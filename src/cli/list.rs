// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! List command - show what a manifest registers

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_registry;
use crate::utils::print_section;

/// Run the list command
pub async fn run(manifest: PathBuf, verbose: bool) -> Result<()> {
    let (_, registry) = load_registry(&manifest)?;

    print_section("Pipelines");
    if registry.pipelines().is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for pipeline in registry.pipelines() {
        println!(
            "  {} {} {}",
            pipeline.id.bold(),
            pipeline.name,
            format!("({} stages)", pipeline.stages.len()).dimmed()
        );

        if verbose {
            if let Some(description) = &pipeline.description {
                println!("    {}", description.dimmed());
            }
            for stage in &pipeline.stages {
                println!("    - {} ({})", stage.id, stage.kind);
            }
        }
    }

    print_section("Artifacts");
    if registry.artifacts().is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for artifact in registry.artifacts() {
        println!(
            "  {} {} {}",
            artifact.id.bold(),
            artifact.name,
            format!("[{}]", artifact.kind).dimmed()
        );
    }

    Ok(())
}
