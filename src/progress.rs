//! # Progress Tracking Module
//!
//! Progress bar visual con `indicatif` per feedback real-time durante il
//! batch: barra con percentuale di completamento, tempo elapsed e messaggio
//! di stato per ogni file completato.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [==============>-------------------------] 45/120 (37%) ✅ photo.jpg: 41.3% saved
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for the optimization batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
