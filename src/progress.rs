//! # Progress Module
//!
//! Spinner su stderr per gli stage lunghi (HandBrake, remux ffmpeg).
//! stdout resta riservato al risultato JSON; quando stderr non è un
//! terminale (es. processo figlio di Electron) indicatif non disegna nulla.
//!
//! ## Esempio:
//! ```rust,ignore
//! let spinner = StageSpinner::start("🎬 Converting with Apple 4K Surround");
//! // ... stage ...
//! spinner.finish("✅ Conversion done");
//! ```

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner for one indeterminate stage
pub struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    /// Start spinning with `message`
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(style);
        }

        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Spinner that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Stop and leave `message` on screen
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop and clear the line
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }

    pub fn elapsed(&self) -> Duration {
        self.bar.elapsed()
    }
}

impl Drop for StageSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
