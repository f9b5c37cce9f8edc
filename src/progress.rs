//! Progress reporting around warehouse round-trips

use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Spinner shown while a warehouse operation runs
#[derive(Debug)]
pub struct Spinner {
    pb: Option<ProgressBar>,
}

impl Spinner {
    /// Start a spinner; hidden when stderr is not a terminal
    pub fn start(message: &str) -> Self {
        if std::io::stderr().is_terminal() {
            Self {
                pb: Some(create_spinner(message)),
            }
        } else {
            Self::hidden()
        }
    }

    /// Spinner that draws nothing
    pub fn hidden() -> Self {
        Self { pb: None }
    }

    pub fn is_visible(&self) -> bool {
        self.pb.is_some()
    }

    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.pb {
            pb.set_message(message.to_string());
        }
    }

    /// Stop and leave `message` on screen
    pub fn finish(mut self, message: &str) {
        if let Some(pb) = self.pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        // Cleared silently when an operation fails midway
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Run `operation` under a spinner, finishing with `done` on success
pub fn with_spinner<T, F>(message: &str, done: &str, operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = Spinner::start(message);
    let result = operation()?;
    spinner.finish(done);
    Ok(result)
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
