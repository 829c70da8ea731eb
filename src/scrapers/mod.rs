//! Paper sources.
//!
//! Every source follows the same per-year pipeline:
//!
//! 1. **Discovery**: fetch the year's listing page(s) or API pages
//! 2. **Harvesting**: fetch and extract each candidate under a concurrency ceiling
//! 3. **Filtering**: keep records whose title or abstract matches a keyword
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | ICML | [`icml`] | HTML scraping | Virtual conference site |
//! | ICLR | [`iclr`] | HTML scraping | Virtual conference site |
//! | NeurIPS | [`neurips`] | HTML scraping | 2025 lists two venues |
//! | Nature Machine Intelligence | [`nature`] | HTML scraping | Year recovered from each article |
//! | Any ISSN | [`openalex`] | OpenAlex works API | Abstracts rebuilt from inverted indexes |
//!
//! Years are processed one after another; concurrency is bounded within a
//! year, never across years or sources.

pub mod iclr;
pub mod icml;
pub mod nature;
pub mod neurips;
pub mod openalex;
pub mod virtual_conf;

use crate::events::{EventSink, HarvestEvent};
use crate::fetch::PageFetcher;
use crate::harvest::DEFAULT_CONCURRENCY;
use crate::matcher::KeywordMatcher;
use crate::models::SourceRun;
use async_trait::async_trait;
use thiserror::Error;

/// Failures allowed to escape a source run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{source_name} {year}: API page failed to decode after {attempts} attempts: {error}")]
    Decode {
        source_name: String,
        year: i32,
        attempts: usize,
        #[source]
        error: serde_json::Error,
    },
    #[error("invalid URL {url}: {error}")]
    Url {
        url: String,
        #[source]
        error: url::ParseError,
    },
}

/// What every source needs to know about the run.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub years: Vec<i32>,
    pub concurrency: usize,
    pub matcher: KeywordMatcher,
}

impl HarvestSettings {
    pub fn new(years: Vec<i32>, matcher: KeywordMatcher) -> Self {
        Self {
            years,
            concurrency: DEFAULT_CONCURRENCY,
            matcher,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// A source that can be run for every configured year.
///
/// Runs are driven on the caller's task: detail fetches interleave
/// cooperatively rather than in parallel.
#[async_trait(?Send)]
pub trait SourceAdapter {
    /// Display name used in records, statistics and reports.
    fn name(&self) -> &str;

    /// Discover, harvest and filter every configured year.
    ///
    /// `fetcher` carries the connection pool for this run only.
    async fn run(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
    ) -> Result<SourceRun, ScrapeError>;
}

/// Report that a source has nothing to do and return an empty run.
pub(crate) fn no_years(source: &str, sink: &dyn EventSink) -> SourceRun {
    sink.emit(HarvestEvent::NoYears {
        source: source.to_string(),
    });
    SourceRun::empty(source)
}

/// Report a finished year using the run's accumulated counters.
pub(crate) fn year_complete(run: &SourceRun, year: i32, sink: &dyn EventSink) {
    sink.emit(HarvestEvent::YearComplete {
        source: run.source.clone(),
        year,
        stats: run.stats.get(&year).copied().unwrap_or_default(),
    });
}
