//! Human-readable transfer progress.
//!
//! Engines call [`ProgressReporter::report`] only after confirmed progress
//! (sender: matching ACK; receiver: in-order frame written).

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{prefix} [{bar:50}] {bytes}/{total_bytes} ({percent}%)";

/// Sink for progress updates.
pub trait ProgressReporter {
    fn report(&mut self, bytes_done: u64, bytes_total: u64);

    /// Called once when the transfer ends successfully.
    fn finish(&mut self) {}
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Box<P> {
    fn report(&mut self, bytes_done: u64, bytes_total: u64) {
        (**self).report(bytes_done, bytes_total);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _bytes_done: u64, _bytes_total: u64) {}
}

/// Terminal progress bar.
#[derive(Debug)]
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    /// A bar labelled `label` (e.g. "sending").  Length is set on the first
    /// report, once the total is known.
    pub fn new(label: &str) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(0).with_style(style);
        bar.set_prefix(label.to_string());
        Self { bar }
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn report(&mut self, bytes_done: u64, bytes_total: u64) {
        self.bar.set_length(bytes_total);
        self.bar.set_position(bytes_done.min(bytes_total));
    }

    fn finish(&mut self) {
        self.bar.finish();
    }
}
