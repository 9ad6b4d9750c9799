//! Progress events emitted by workers.
//!
//! Workers never render anything. They push [`ProgressEvent`]s into an
//! unbounded channel through a [`ProgressReporter`]; a single consumer (the CLI
//! renderer, or nothing at all) owns the display.

use std::path::PathBuf;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::outcome::OutcomeBucket;
use crate::session::WorkerId;

/// Snapshot of one worker's activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A worker picked up an item.
    ItemStarted {
        /// Worker processing the item.
        worker: WorkerId,
        /// Item URL.
        url: String,
    },
    /// A worker started streaming a file.
    FileStarted {
        /// Worker.
        worker: WorkerId,
        /// Destination path.
        path: PathBuf,
        /// Declared content length, if any.
        total_bytes: Option<u64>,
    },
    /// Bytes were written for the current file.
    FileProgress {
        /// Worker.
        worker: WorkerId,
        /// Cumulative bytes written.
        bytes_written: u64,
        /// Declared content length, if any.
        total_bytes: Option<u64>,
    },
    /// A worker finished an item.
    ItemFinished {
        /// Worker.
        worker: WorkerId,
        /// Item URL.
        url: String,
        /// Final outcome.
        outcome: OutcomeBucket,
    },
}

/// Cloneable sending side of the progress channel.
///
/// Sending never blocks and never fails: events sent after the consumer went
/// away, or on a disabled reporter, are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Creates a reporter and the receiver its events arrive on.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A reporter that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sends an event.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

/// Formats a byte count with three decimals: `bytes`, `KB` ... `PB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_readable_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 6] = ["bytes", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut suffix = SUFFIXES[0];
    for (i, candidate) in SUFFIXES.iter().enumerate() {
        suffix = candidate;
        if size < 1024.0 || i == SUFFIXES.len() - 1 {
            break;
        }
        size /= 1024.0;
    }
    format!("{size:.3} {suffix}")
}
