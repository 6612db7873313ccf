//! Stage-by-stage progress display for a mosaic build

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::LazyLock;
use std::time::Duration;

/// Shows one progress line per build stage
///
/// Stages with a known length get a bar; the rest get a spinner. Finished
/// stages stay on screen with a summary message until [`ProgressManager::finish`].
pub struct ProgressManager {
    multi_progress: MultiProgress,
    stage_bar: Option<ProgressBar>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static BAR_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{prefix:>10}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

static SPINNER_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{prefix:>10} {spinner} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            stage_bar: None,
        }
    }

    /// Begin a stage, finishing any stage still open
    ///
    /// `length` is the number of steps, or `None` for a spinner.
    pub fn start_stage(&mut self, name: &str, length: Option<usize>) {
        self.finish_stage("");
        let bar = match length {
            Some(len) => {
                let bar = ProgressBar::new(len as u64);
                bar.set_style(BAR_STYLE.clone());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(SPINNER_STYLE.clone());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_prefix(name.to_string());
        self.stage_bar = Some(self.multi_progress.add(bar));
    }

    /// Report the number of completed steps in the current stage
    pub fn advance(&self, position: usize) {
        if let Some(ref bar) = self.stage_bar {
            bar.set_position(position as u64);
        }
    }

    /// Close the current stage with a summary message
    pub fn finish_stage(&mut self, message: &str) {
        if let Some(bar) = self.stage_bar.take() {
            if let Some(len) = bar.length() {
                bar.set_position(len);
            }
            bar.finish_with_message(message.to_string());
        }
    }

    /// Clean up all progress displays
    pub fn finish(&mut self) {
        self.finish_stage("");
        let _ = self.multi_progress.clear();
    }
}
