//! Terminal progress display fed by worker events.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tiktok_downloader_core::progress::human_readable_size;
use tiktok_downloader_core::{OutcomeBucket, ProgressEvent, WorkerId};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use url::Url;

/// Renders one overall bar plus one lane per active worker.
struct ProgressView {
    multi: MultiProgress,
    overall: ProgressBar,
    lanes: HashMap<WorkerId, ProgressBar>,
    downloaded: usize,
    failed: usize,
    skipped: usize,
}

impl ProgressView {
    fn new(label: &str, total: usize, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(
            ProgressStyle::with_template("{prefix:.bold} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        overall.set_prefix(label.to_string());
        Self {
            multi,
            overall,
            lanes: HashMap::new(),
            downloaded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn lane(&mut self, worker: WorkerId) -> &ProgressBar {
        let multi = &self.multi;
        self.lanes.entry(worker).or_insert_with(|| {
            let lane = multi.add(ProgressBar::new_spinner());
            lane.set_style(
                ProgressStyle::with_template("  {prefix} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            lane.set_prefix(worker.to_string());
            lane
        })
    }

    fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::ItemStarted { worker, url } => {
                self.lane(worker).set_message(item_label(&url));
            }
            ProgressEvent::FileStarted {
                worker,
                path,
                total_bytes,
            } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let size = total_bytes.map_or_else(|| "?".to_string(), human_readable_size);
                self.lane(worker).set_message(format!("{name} ({size})"));
            }
            ProgressEvent::FileProgress {
                worker,
                bytes_written,
                total_bytes,
            } => {
                let written = human_readable_size(bytes_written);
                let message = match total_bytes {
                    Some(total) if total > 0 => {
                        format!("{written} / {} ({}%)", human_readable_size(total), bytes_written * 100 / total)
                    }
                    _ => written,
                };
                self.lane(worker).set_message(message);
            }
            ProgressEvent::ItemFinished { worker, outcome, .. } => {
                match outcome {
                    o if o.is_downloaded() => self.downloaded += 1,
                    OutcomeBucket::ParseError
                    | OutcomeBucket::DownloadError
                    | OutcomeBucket::ProxyError => self.failed += 1,
                    _ => self.skipped += 1,
                }
                self.lane(worker).set_message("idle");
                self.overall.inc(1);
                self.overall.set_message(format!(
                    "downloaded {} | skipped {} | failed {}",
                    self.downloaded, self.skipped, self.failed
                ));
            }
        }
    }

    fn finish(self) {
        for lane in self.lanes.values() {
            lane.finish_and_clear();
        }
        self.overall.finish();
    }
}

/// Short label for an item URL: its path, or the raw text if it does not parse.
fn item_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|parsed| parsed.path().trim_end_matches('/').to_string())
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Spawns the single consumer task that owns the display.
///
/// The task ends when every sender is dropped. With `visible` false events are
/// drained without drawing.
pub fn spawn_progress_ui(
    label: &str,
    total: usize,
    visible: bool,
    mut events: UnboundedReceiver<ProgressEvent>,
) -> JoinHandle<()> {
    let mut view = ProgressView::new(label, total, visible);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            view.apply(event);
        }
        view.finish();
    })
}
