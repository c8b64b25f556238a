// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Run command - drive a pipeline wave by wave

use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_registry, report};
use crate::errors::{PipesimError, RecoverySuggestion};
use crate::pipeline::{
    status_line, summarize, ExecutionContext, Scheduler, StageGraph, StageStatus, StageTransition,
};
use crate::runner::{build_runner, with_retry, Runner, SimulatedRunner};
use crate::utils::{status_marker, style_run_status, RunProgress};

/// Run a pipeline
pub async fn run(
    manifest: PathBuf,
    pipeline: String,
    simulate: bool,
    fail: Vec<String>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let (config, registry) = load_registry(&manifest)?;
    let pipeline = registry.get_pipeline(&pipeline).map_err(report)?;
    let graph = StageGraph::build(Arc::clone(&pipeline)).map_err(|e| report(e.into()))?;

    if let Some(unknown) = fail.iter().find(|id| graph.stage(id).is_none()) {
        return Err(PipesimError::StageNotFound {
            stage: unknown.clone(),
        }
        .into());
    }

    let runner: Arc<dyn Runner> = if simulate || !fail.is_empty() {
        let simulated = fail
            .iter()
            .fold(SimulatedRunner::new(), |runner, id| runner.failing(id.clone()));
        with_retry(Arc::new(simulated), &config.retry)
    } else {
        build_runner(&config)
    };

    let mut scheduler = Scheduler::new(runner);
    if let Some(max_parallel) = config.max_parallel {
        scheduler = scheduler.with_max_parallel(max_parallel);
    }

    let token = scheduler.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut ctx = scheduler
        .start(Scheduler::plan(graph))
        .map_err(|e| report(e.into()))?;

    let progress = if json {
        RunProgress::quiet()
    } else {
        println!(
            "{} {} ({} stages, {} waves)",
            "Running".bold(),
            pipeline.name.bold(),
            ctx.plan().stage_count(),
            ctx.plan().wave_count()
        );
        RunProgress::new(ctx.plan().stage_count(), &pipeline.id)
    };

    while !ctx.is_terminal() {
        let step = scheduler.advance(&mut ctx).await.map_err(report)?;

        if let Some(wave) = step.wave {
            progress.println(format!(
                "\n{}",
                format!("Wave {}/{}", wave + 1, ctx.plan().wave_count()).bold()
            ));
        }
        for transition in &step.transitions {
            progress.println(describe(&ctx, transition, verbose));
        }
        progress.println(format!("  {}", status_line(&ctx).dimmed()));

        let finished = ctx
            .stages()
            .filter(|(_, state)| state.status.is_terminal())
            .count();
        progress.set_finished(finished);
    }

    progress.finish();
    ctrl_c.abort();

    let summary = summarize(&ctx);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).into_diagnostic()?
        );
    } else {
        println!();
        println!(
            "{} {}: {} succeeded, {} failed, {} skipped",
            "Result".bold(),
            style_run_status(summary.status),
            summary.counts.succeeded,
            summary.counts.failed,
            summary.counts.skipped
        );
    }

    if summary.status.is_success() {
        return Ok(());
    }

    if !json {
        print_suggestions(&ctx);
    }

    Err(miette::miette!(
        "Pipeline '{}' {}",
        pipeline.id,
        summary.status
    ))
}

/// One line for a stage transition
fn describe(ctx: &ExecutionContext, transition: &StageTransition, verbose: bool) -> String {
    let marker = status_marker(transition.to);
    let stage = &transition.stage;
    let state = ctx.state(stage);

    match transition.to {
        StageStatus::Running => format!("  {} {} started", marker, stage),
        StageStatus::Succeeded => {
            let mut line = format!("  {} {} succeeded", marker, stage);
            if let Some(output) = state.and_then(|s| s.output.as_ref()) {
                if output.attempts > 1 {
                    line.push_str(&format!(" after {} attempts", output.attempts));
                }
                if verbose && !output.stdout.trim().is_empty() {
                    line.push_str(&format!("\n      {}", output.stdout.trim().dimmed()));
                }
            }
            line
        }
        StageStatus::Failed => match state.and_then(|s| s.error.as_ref()) {
            Some(error) => format!("  {} {} failed: {}", marker, stage, error.to_string().red()),
            None => format!("  {} {} failed", marker, stage),
        },
        StageStatus::Skipped => match state.and_then(|s| s.skip_reason.as_ref()) {
            Some(reason) => format!("  {} {} skipped ({})", marker, stage.dimmed(), reason),
            None => format!("  {} {} skipped", marker, stage.dimmed()),
        },
        StageStatus::Pending => format!("  {} {}", marker, stage),
    }
}

fn print_suggestions(ctx: &ExecutionContext) {
    for (stage, state) in ctx.stages() {
        let Some(error) = &state.error else {
            continue;
        };

        let skipped: Vec<String> = ctx
            .plan()
            .graph()
            .transitive_dependents(&stage.id)
            .into_iter()
            .filter(|id| ctx.status(id) == Some(StageStatus::Skipped))
            .map(String::from)
            .collect();

        eprintln!();
        eprint!(
            "{}",
            RecoverySuggestion::stage_failed(&stage.id, error, &skipped)
                .to_string()
                .yellow()
        );
    }
}
