// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Validate command - check pipeline definitions

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_registry, report};
use crate::errors::RecoverySuggestion;
use crate::pipeline::PipelineValidator;
use crate::utils::{print_error, print_success, print_warning};

/// Run the validate command
pub async fn run(manifest: PathBuf, pipeline: Option<String>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipelines...".bold());

    let (_, registry) = load_registry(&manifest)?;

    let pipelines = match pipeline {
        Some(id) => vec![registry.get_pipeline(&id).map_err(report)?],
        None => registry.pipelines().to_vec(),
    };

    let mut invalid = 0;

    for pipeline in &pipelines {
        let validation = PipelineValidator::validate(pipeline);

        println!();
        println!("{}:", pipeline.id.bold());

        if validation.is_valid() {
            let mut line = format!("{} stages, no errors", pipeline.stages.len());
            if validation.has_warnings() {
                line.push_str(&format!(" ({} warnings)", validation.warnings.len()));
            }
            print_success(&line);
        } else {
            invalid += 1;
        }

        for error in &validation.errors {
            print_error(&error.to_string());
            if verbose {
                let suggestion = RecoverySuggestion::for_validation(error);
                for line in suggestion.to_string().lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }

        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    println!();

    if invalid > 0 {
        Err(miette::miette!(
            "{} of {} pipelines failed validation",
            invalid,
            pipelines.len()
        ))
    } else {
        println!("{}", "All pipelines are valid!".green().bold());
        Ok(())
    }
}
