//! Data models for harvested papers and per-year scan statistics.
//!
//! This module defines the core data structures shared by every source:
//! - [`PaperRecord`]: One keyword-matching publication
//! - [`YearStats`]: Scanned/found counters for one (source, year) pair
//! - [`StatsTable`]: Per-year statistics for one source
//! - [`SourceRun`]: Everything a source adapter hands back to the orchestrator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used when no extraction strategy recovers an author list.
pub const UNKNOWN_AUTHORS: &str = "Unknown Authors";

/// A discovered publication whose title or abstract matched the keywords.
///
/// Records are built once at the end of a detail-page extraction and are not
/// mutated afterwards. Exporters may reorder or group them freely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaperRecord {
    /// Venue or journal name, e.g. `"ICML"` or `"Nature Machine Intelligence"`.
    pub source: String,
    /// Publication year.
    pub year: i32,
    /// Display title.
    pub title: String,
    /// Comma-joined author names, or [`UNKNOWN_AUTHORS`].
    pub authors: String,
    /// Plain-text abstract, possibly empty.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Absolute detail-page URL.
    pub url: String,
}

/// Scan counters for a single (source, year) pair.
///
/// `found` never exceeds `scanned`: both are only advanced through
/// [`YearStats::record_scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct YearStats {
    /// Detail pages (or API works) that were actually fetched and examined.
    pub scanned: u32,
    /// Scanned items that matched the keywords.
    pub found: u32,
}

impl YearStats {
    pub fn new(scanned: u32, found: u32) -> Self {
        Self { scanned, found }
    }

    /// Count one examined item, and one match if `matched`.
    pub fn record_scan(&mut self, matched: bool) {
        self.scanned += 1;
        if matched {
            self.found += 1;
        }
    }
}

/// Per-year statistics for one source, ordered by year.
pub type StatsTable = BTreeMap<i32, YearStats>;

/// Result of running one source adapter over all configured years.
#[derive(Debug, Default, Clone)]
pub struct SourceRun {
    /// Display name of the source the run belongs to.
    pub source: String,
    pub records: Vec<PaperRecord>,
    pub stats: StatsTable,
}

impl SourceRun {
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            records: Vec::new(),
            stats: StatsTable::new(),
        }
    }

    /// Seed zeroed counters for every configured year so years with no
    /// discoverable papers still show up in the report.
    pub fn with_years(source: &str, years: &[i32]) -> Self {
        let mut run = Self::empty(source);
        for &year in years {
            run.stats.entry(year).or_default();
        }
        run
    }

    /// Fold another batch of records and statistics into this run.
    pub fn absorb(&mut self, records: Vec<PaperRecord>, stats: StatsTable) {
        self.records.extend(records);
        for (year, s) in stats {
            let entry = self.stats.entry(year).or_default();
            entry.scanned += s.scanned;
            entry.found += s.found;
        }
    }
}
