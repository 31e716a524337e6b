//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for the current step of a one-shot CLI command
#[derive(Debug)]
pub struct StepReporter {
    current: Option<ProgressBar>,
    show_progress: bool,
}

impl StepReporter {
    pub fn new(show_progress: bool) -> Self {
        Self {
            current: None,
            show_progress,
        }
    }

    /// Start a step, finishing the previous one
    pub fn step(&mut self, message: &str) {
        self.finish_current(None);
        if self.show_progress {
            self.current = Some(create_spinner(message));
        }
    }

    /// Finish the running step with a final message
    pub fn done(&mut self, message: &str) {
        self.finish_current(Some(message));
    }

    fn finish_current(&mut self, message: Option<&str>) {
        if let Some(pb) = self.current.take() {
            match message {
                Some(message) => pb.finish_with_message(message.to_string()),
                None => pb.finish_and_clear(),
            }
        }
    }
}

impl Drop for StepReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
