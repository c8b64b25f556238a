// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Color and styling utilities
//!
//! Consistent styling for terminal output.

use colored::{ColoredString, Colorize};

use crate::pipeline::{RunStatus, StageStatus};

/// Marker shown in front of a stage in a given status
pub fn status_marker(status: StageStatus) -> ColoredString {
    match status {
        StageStatus::Pending => "·".dimmed(),
        StageStatus::Running => "→".blue(),
        StageStatus::Succeeded => "✓".green(),
        StageStatus::Failed => "✗".red(),
        StageStatus::Skipped => "○".dimmed(),
    }
}

/// Style a run status
pub fn style_run_status(status: RunStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        RunStatus::Succeeded => text.green().bold(),
        RunStatus::Failed => text.red().bold(),
        RunStatus::PartiallyFailed | RunStatus::Cancelled => text.yellow().bold(),
        RunStatus::Pending | RunStatus::Running => text.blue(),
    }
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}
