//! Conference virtual sites (`<base>/virtual/<year>/...`).
//!
//! ICML, ICLR and NeurIPS publish the same site shape: a `papers.html`
//! listing per year linking to poster, oral and spotlight pages. They differ
//! only in base URL, listing pages and extraction recipe, captured by a
//! [`ConferenceProfile`].

use super::{HarvestSettings, ScrapeError, SourceAdapter, no_years, year_complete};
use crate::discover::{Discoverer, LinkRule};
use crate::events::EventSink;
use crate::extract::{FieldExtractor, FieldRecipe};
use crate::fetch::{NO_HEADERS, PageFetcher};
use crate::harvest::{DetailTask, Harvester, YearPolicy};
use crate::models::SourceRun;
use async_trait::async_trait;
use tracing::instrument;

/// What distinguishes one conference site from another.
#[derive(Debug)]
pub struct ConferenceProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub recipe: &'static FieldRecipe,
    /// Listing pages for a year.
    pub listing_urls: fn(base_url: &str, year: i32) -> Vec<String>,
}

/// The usual single listing page, `<base>/virtual/<year>/papers.html`.
pub fn papers_page(base_url: &str, year: i32) -> Vec<String> {
    vec![format!("{base_url}/virtual/{year}/papers.html")]
}

/// Source adapter for a conference virtual site.
pub struct VirtualConference {
    profile: &'static ConferenceProfile,
    settings: HarvestSettings,
    base_url: String,
}

impl VirtualConference {
    pub fn new(profile: &'static ConferenceProfile, settings: HarvestSettings) -> Self {
        Self {
            profile,
            settings,
            base_url: profile.base_url.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl SourceAdapter for VirtualConference {
    fn name(&self) -> &str {
        self.profile.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.profile.name))]
    async fn run(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
    ) -> Result<SourceRun, ScrapeError> {
        let name = self.profile.name;
        if self.settings.years.is_empty() {
            return Ok(no_years(name, sink));
        }

        let discoverer = Discoverer {
            source: name,
            fetcher,
            headers: NO_HEADERS,
            sink,
        };
        let harvester = Harvester::new(name, self.settings.concurrency, sink);
        let mut run = SourceRun::with_years(name, &self.settings.years);

        for &year in &self.settings.years {
            let listing_urls = (self.profile.listing_urls)(&self.base_url, year);
            let candidates = discoverer
                .discover(year, &listing_urls, &LinkRule::virtual_site(year))
                .await;

            let task = DetailTask {
                source: name,
                fetcher,
                headers: NO_HEADERS,
                extractor: FieldExtractor::new(self.profile.recipe),
                matcher: &self.settings.matcher,
                years: YearPolicy::Listing(year),
            };
            let (records, stats) = harvester
                .run(year, candidates, |candidate| task.run(candidate))
                .await;

            run.absorb(records, stats);
            year_complete(&run, year, sink);
        }

        Ok(run)
    }
}

#[cfg(test)]
impl VirtualConference {
    /// Point the adapter at a stub host.
    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HarvestEvent;
    use crate::events::recording::RecordingSink;
    use crate::fetch::FetchFailure;
    use crate::fetch::stub::StubFetcher;
    use crate::matcher::KeywordMatcher;
    use crate::models::YearStats;
    use crate::scrapers::icml;

    fn settings(years: Vec<i32>) -> HarvestSettings {
        HarvestSettings::new(years, KeywordMatcher::new(&["transformer"])).with_concurrency(2)
    }

    fn detail(abstract_text: &str) -> String {
        format!(
            r#"<html><head><meta name="citation_author" content="A. Author"></head>
            <body><div class="abstract">{abstract_text}</div></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_three_links_two_matches() {
        let fetcher = StubFetcher::new()
            .page(
                "https://icml.cc/virtual/2024/papers.html",
                r#"<a href="/virtual/2024/poster/1">Transformers for Tabular Data</a>
                   <a href="/virtual/2024/oral/2">Sparse Transformer Routing</a>
                   <a href="/virtual/2024/poster/3">Bayesian Optimization Revisited</a>"#,
            )
            .page("https://icml.cc/virtual/2024/poster/1", &detail("Tables."))
            .page("https://icml.cc/virtual/2024/oral/2", &detail("Routing."))
            .page("https://icml.cc/virtual/2024/poster/3", &detail("Gaussian processes."));
        let sink = RecordingSink::default();
        let adapter = VirtualConference::new(&icml::PROFILE, settings(vec![2024]));

        let run = adapter.run(&fetcher, &sink).await.unwrap();

        assert_eq!(run.records.len(), 2);
        assert_eq!(run.stats.len(), 1);
        assert_eq!(run.stats[&2024], YearStats::new(3, 2));
        assert!(run.records.iter().all(|r| r.source == "ICML" && r.year == 2024));
        assert!(run.records.iter().all(|r| r.authors == "A. Author"));
        assert!(sink.events().contains(&HarvestEvent::YearComplete {
            source: "ICML".into(),
            year: 2024,
            stats: YearStats::new(3, 2),
        }));
    }

    #[tokio::test]
    async fn test_failed_detail_fetch_is_not_scanned() {
        let fetcher = StubFetcher::new()
            .page(
                "https://icml.cc/virtual/2024/papers.html",
                r#"<a href="/virtual/2024/poster/1">Transformer A</a>
                   <a href="/virtual/2024/poster/2">Transformer B</a>"#,
            )
            .page("https://icml.cc/virtual/2024/poster/1", &detail(""))
            .failing("https://icml.cc/virtual/2024/poster/2", FetchFailure::Timeout);
        let sink = RecordingSink::default();
        let adapter = VirtualConference::new(&icml::PROFILE, settings(vec![2024]));

        let run = adapter.run(&fetcher, &sink).await.unwrap();

        assert_eq!(run.records.len(), 1);
        assert_eq!(run.stats[&2024], YearStats::new(1, 1));
    }

    #[tokio::test]
    async fn test_missing_listing_leaves_zeroed_year() {
        let fetcher = StubFetcher::new();
        let sink = RecordingSink::default();
        let adapter = VirtualConference::new(&icml::PROFILE, settings(vec![2023, 2024]));

        let run = adapter.run(&fetcher, &sink).await.unwrap();

        assert!(run.records.is_empty());
        assert_eq!(run.stats[&2023], YearStats::default());
        assert_eq!(run.stats[&2024], YearStats::default());
        let failures = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, HarvestEvent::ListingFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_no_years_returns_empty_run() {
        let fetcher = StubFetcher::new();
        let sink = RecordingSink::default();
        let adapter = VirtualConference::new(&icml::PROFILE, settings(vec![]));

        let run = adapter.run(&fetcher, &sink).await.unwrap();

        assert!(run.records.is_empty());
        assert!(run.stats.is_empty());
        assert!(fetcher.requests().is_empty());
        assert_eq!(
            sink.events(),
            vec![HarvestEvent::NoYears {
                source: "ICML".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let fetcher = StubFetcher::new().page(
            "http://stub.test/virtual/2024/papers.html",
            r#"<a href="/virtual/2024/poster/9">Transformer</a>"#,
        );
        let sink = RecordingSink::default();
        let adapter = VirtualConference::new(&icml::PROFILE, settings(vec![2024]))
            .with_base_url("http://stub.test");

        let run = adapter.run(&fetcher, &sink).await.unwrap();

        // The detail page is missing from the stub, so nothing is scanned.
        assert_eq!(run.stats[&2024], YearStats::default());
        assert_eq!(fetcher.requests()[1].0, "http://stub.test/virtual/2024/poster/9");
    }
}
