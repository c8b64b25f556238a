// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesim contributors

//! Run progress display
//!
//! Wraps an `indicatif` bar counting finished stages. Lines printed through
//! [`RunProgress::println`] appear above the bar and still reach stdout when
//! the bar is hidden.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} stages")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");

    let pb = ProgressBar::new(total);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Progress of one run, or nothing when output is machine-readable
pub struct RunProgress {
    bar: Option<ProgressBar>,
}

impl RunProgress {
    /// Bar over `total` stages
    pub fn new(total: usize, message: &str) -> Self {
        Self {
            bar: Some(create_progress_bar(total as u64, message)),
        }
    }

    /// No bar and no output
    pub fn quiet() -> Self {
        Self { bar: None }
    }

    pub fn is_quiet(&self) -> bool {
        self.bar.is_none()
    }

    /// Print a line above the bar
    pub fn println(&self, line: impl AsRef<str>) {
        if let Some(bar) = &self.bar {
            bar.suspend(|| println!("{}", line.as_ref()));
        }
    }

    /// Number of stages that have finished
    pub fn set_finished(&self, finished: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(finished as u64);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_progress_tracks_position() {
        let progress = RunProgress::new(3, "ci");
        progress.set_finished(2);

        assert_eq!(progress.bar.as_ref().map(|b| b.position()), Some(2));
        assert!(!progress.is_quiet());
    }

    #[test]
    fn test_quiet_progress_is_inert() {
        let progress = RunProgress::quiet();
        progress.set_finished(5);
        progress.finish();

        assert!(progress.is_quiet());
    }
}
