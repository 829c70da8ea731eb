//! Observable harvest events.
//!
//! Sources and the harvester never print. They report what happened as
//! [`HarvestEvent`]s through an injected [`EventSink`]; the binary wires a
//! [`ProgressSink`] over a [`TracingSink`], tests wire a recorder.

use crate::models::YearStats;
use crate::utils::truncate_for_log;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Something worth observing during a source run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    /// A listing page could not be fetched; discovery continues with the rest.
    ListingFailed {
        source: String,
        year: i32,
        url: String,
        reason: String,
    },
    /// Candidate detail pages found for a year.
    Discovered {
        source: String,
        year: i32,
        candidates: usize,
    },
    /// A detail page could not be fetched; the task yields no record.
    FetchFailed {
        source: String,
        url: String,
        reason: String,
    },
    /// A page was fetched but dropped before counting (e.g. year outside the filter).
    Dropped {
        source: String,
        url: String,
        reason: String,
    },
    MatchFound {
        source: String,
        year: i32,
        title: String,
    },
    /// One more task of the current batch resolved.
    TaskCompleted {
        source: String,
        year: i32,
        completed: usize,
        total: usize,
    },
    YearComplete {
        source: String,
        year: i32,
        stats: YearStats,
    },
    /// The source has no years configured and nothing to fall back on.
    NoYears { source: String },
    /// An API page failed to decode and will be retried.
    DecodeRetry {
        source: String,
        year: i32,
        attempt: usize,
        reason: String,
    },
    /// API pagination ended early because a page could not be fetched.
    PaginationStopped {
        source: String,
        year: i32,
        reason: String,
    },
}

/// Receiver of [`HarvestEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Writes every event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::ListingFailed {
                source,
                year,
                url,
                reason,
            } => warn!(%source, year, %url, %reason, "Failed to load paper list"),
            HarvestEvent::Discovered {
                source,
                year,
                candidates,
            } => info!(%source, year, candidates, "Discovered papers; fetching details"),
            HarvestEvent::FetchFailed {
                source,
                url,
                reason,
            } => warn!(%source, %url, %reason, "Detail fetch failed; skipping"),
            HarvestEvent::Dropped {
                source,
                url,
                reason,
            } => debug!(%source, %url, %reason, "Dropped page"),
            HarvestEvent::MatchFound {
                source,
                year,
                title,
            } => info!(%source, year, title = %truncate_for_log(&title, 50), "Found"),
            HarvestEvent::TaskCompleted {
                source,
                year,
                completed,
                total,
            } => debug!(%source, year, completed, total, "Task completed"),
            HarvestEvent::YearComplete {
                source,
                year,
                stats,
            } => info!(
                %source,
                year,
                scanned = stats.scanned,
                found = stats.found,
                "Year complete"
            ),
            HarvestEvent::NoYears { source } => {
                warn!(%source, "No years provided. Use --years to specify years.")
            }
            HarvestEvent::DecodeRetry {
                source,
                year,
                attempt,
                reason,
            } => warn!(%source, year, attempt, %reason, "API page failed to decode; retrying"),
            HarvestEvent::PaginationStopped {
                source,
                year,
                reason,
            } => warn!(%source, year, %reason, "API page fetch failed; stopping pagination"),
        }
    }
}

/// Draws a per-year progress bar and forwards every event to an inner sink.
pub struct ProgressSink<S> {
    inner: S,
    bar: Mutex<Option<ProgressBar>>,
}

impl<S: EventSink> ProgressSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            bar: Mutex::new(None),
        }
    }
}

fn create_count_progress_bar(total_items: u64, message: String) -> ProgressBar {
    let pb = ProgressBar::new(total_items);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message);
    pb
}

impl<S: EventSink> EventSink for ProgressSink<S> {
    fn emit(&self, event: HarvestEvent) {
        let Ok(mut slot) = self.bar.lock() else {
            self.inner.emit(event);
            return;
        };

        match &event {
            HarvestEvent::Discovered {
                source,
                year,
                candidates,
            } => {
                if let Some(old) = slot.take() {
                    old.finish_and_clear();
                }
                self.inner.emit(event.clone());
                *slot = Some(create_count_progress_bar(
                    *candidates as u64,
                    format!("{source} {year}"),
                ));
                return;
            }
            HarvestEvent::TaskCompleted { completed, .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_position(*completed as u64);
                }
            }
            HarvestEvent::YearComplete { .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
            _ => {}
        }

        match slot.as_ref() {
            Some(bar) => bar.suspend(|| self.inner.emit(event)),
            None => self.inner.emit(event),
        }
    }
}
