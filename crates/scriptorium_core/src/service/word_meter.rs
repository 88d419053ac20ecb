//! Background word and character counting.
//!
//! # Responsibility
//! - Turn markdown content into plain text and count words and characters.
//! - Run counts off the caller's thread and report back over a channel.
//!
//! # Invariants
//! - Workers only compute; applying a report to the store is the caller's
//!   job (`TreeHub::apply_counts`).
//! - Reports from one `WordMeter` arrive on one receiver, in completion order.

use crate::model::{ItemId, ProjectId};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)]\([^)]*\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static MARKDOWN_LINE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#{1,6}|>|[-*+]|\d+[.)])[ \t]+").expect("valid line marker regex")
});
static MARKDOWN_EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*_`~]+").expect("valid emphasis regex"));

/// Word and character totals of one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCounts {
    pub words: i64,
    pub characters: i64,
}

/// Counts computed for one tree item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCountReport {
    pub project_id: ProjectId,
    pub item_id: ItemId,
    pub counts: TextCounts,
    /// Whether applying the report should mark the project modified.
    pub mark_modified: bool,
}

/// Strips markdown syntax, keeping the readable text.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(markdown, "$1");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_markers = MARKDOWN_LINE_MARKER_RE.replace_all(&without_links, "");
    let plain = MARKDOWN_EMPHASIS_RE.replace_all(&without_markers, "");
    plain.trim().to_string()
}

/// Counts words and characters of markdown `text` on the current thread.
pub fn count_text_now(text: &str) -> TextCounts {
    let plain = markdown_to_plain_text(text);
    TextCounts {
        words: plain.split_whitespace().count() as i64,
        characters: plain.chars().count() as i64,
    }
}

/// Dispatches counts to worker threads and collects their reports.
pub struct WordMeter {
    sender: Sender<WordCountReport>,
    receiver: Receiver<WordCountReport>,
    workers: Vec<JoinHandle<()>>,
}

impl Default for WordMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl WordMeter {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            workers: Vec::new(),
        }
    }

    /// Counts `text` for one item.
    ///
    /// With `same_thread` the report is queued before this returns;
    /// otherwise a worker thread computes it.
    pub fn count_text(
        &mut self,
        project_id: ProjectId,
        item_id: ItemId,
        text: String,
        same_thread: bool,
        mark_modified: bool,
    ) {
        let sender = self.sender.clone();
        let job = move || {
            let counts = count_text_now(&text);
            debug!(
                "event=word_count module=service status=ok project_id={project_id} item_id={item_id} words={} characters={}",
                counts.words, counts.characters
            );
            // The meter may be dropped before a worker finishes.
            let _ = sender.send(WordCountReport {
                project_id,
                item_id,
                counts,
                mark_modified,
            });
        };

        if same_thread {
            job();
        } else {
            self.workers.retain(|worker| !worker.is_finished());
            self.workers.push(thread::spawn(job));
        }
    }

    /// Reports available right now, without blocking.
    pub fn try_reports(&self) -> Vec<WordCountReport> {
        self.receiver.try_iter().collect()
    }

    /// Waits up to `timeout` for the next report.
    pub fn wait_report(&self, timeout: Duration) -> Option<WordCountReport> {
        match self.receiver.recv_timeout(timeout) {
            Ok(report) => Some(report),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Joins every running worker and returns all pending reports.
    pub fn wait_idle(&mut self) -> Vec<WordCountReport> {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("event=word_count module=service status=error error_code=worker_panicked");
            }
        }
        self.try_reports()
    }
}
