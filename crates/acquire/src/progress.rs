//! Progress sinks for file transfers.
//!
//! A sink only observes byte counts; nothing it does can change the outcome
//! of a transfer.

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

/// Factory for per-transfer progress trackers.
pub trait ProgressSink: Send + Sync {
    /// Called once the response headers are in. `total` is `None` when the
    /// server did not declare a usable `Content-Length`.
    fn begin(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress>;
}

/// Progress of one running transfer.
pub trait TransferProgress: Send {
    fn advance(&mut self, bytes: u64);

    fn finish(&mut self);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&self, _label: &str, _total: Option<u64>) -> Box<dyn TransferProgress> {
        Box::new(NoProgress)
    }
}

impl TransferProgress for NoProgress {
    fn advance(&mut self, _bytes: u64) {}

    fn finish(&mut self) {}
}

/// Terminal progress bars.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn begin(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress> {
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.yellow} [{bar:30.yellow/white}] {bytes}/{total_bytes} {bytes_per_sec} {msg}",
                    )
                    .expect("valid progress template")
                    .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.yellow} {bytes} {bytes_per_sec} {msg}")
                        .expect("valid progress template"),
                );
                bar
            }
        };
        bar.set_message(label.to_owned());
        Box::new(ConsoleBar {
            bar,
            label: label.to_owned(),
        })
    }
}

struct ConsoleBar {
    bar: ProgressBar,
    label: String,
}

impl TransferProgress for ConsoleBar {
    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&mut self) {
        let done = HumanBytes(self.bar.position());
        self.bar
            .finish_with_message(format!("{} ({done})", self.label));
    }
}

impl Drop for ConsoleBar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
