//! Journals indexed by [OpenAlex](https://openalex.org), selected by ISSN.
//!
//! Works are listed per year through the cursor-paginated `/works` endpoint.
//! OpenAlex ships abstracts as inverted indexes, which are rebuilt into
//! plain text. Works are scored from the API data alone; a matching work
//! that lacks an abstract or authors then has its landing page fetched to
//! fill the gaps. Landing pages are fetched one at a time, each after a
//! randomised politeness delay.
//!
//! A page that cannot be fetched ends pagination for the year and keeps what
//! was collected. A page that is fetched but cannot be decoded is retried with
//! a linear backoff; if it still fails the whole run fails.

use super::{HarvestSettings, ScrapeError, SourceAdapter, no_years, year_complete};
use crate::events::{EventSink, HarvestEvent};
use crate::extract::{FieldExtractor, FieldRecipe, Strategy, reconstruct_abstract};
use crate::fetch::{BROWSER_HEADERS, NO_HEADERS, PageFetcher};
use crate::harvest::{Harvester, TaskOutcome};
use crate::models::{PaperRecord, SourceRun, UNKNOWN_AUTHORS};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const API_BASE: &str = "https://api.openalex.org/works";

const PER_PAGE: &str = "200";
const SELECT: &str = "title,publication_year,primary_location,authorships,abstract_inverted_index";
const FIRST_CURSOR: &str = "*";

/// Decode attempts per API page before the run fails.
const DECODE_ATTEMPTS: usize = 3;

/// Landing pages in flight at once; the politeness delay only spaces
/// requests out when they are issued serially.
const LANDING_CONCURRENCY: usize = 1;

/// Landing pages are mostly publisher article pages.
static LANDING_RECIPE: FieldRecipe = FieldRecipe {
    title: &[],
    authors: &[
        Strategy::MetaNameAll("citation_author"),
        Strategy::RegionList(".c-article-author-list__item"),
    ],
    abstract_text: &[
        Strategy::MetaName("description"),
        Strategy::MetaProperty("og:description"),
        Strategy::Region(r#"section[data-title="Abstract"]"#),
        Strategy::Region("div#Abs1-content"),
    ],
    year: &[],
};

/// A journal to harvest: display name plus print or electronic ISSN.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JournalTarget {
    pub name: String,
    pub issn: String,
}

impl JournalTarget {
    pub fn new(name: &str, issn: &str) -> Self {
        Self {
            name: name.to_string(),
            issn: issn.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorksPage {
    /// Absent and `null` both mean an empty page.
    #[serde(default)]
    results: Option<Vec<Work>>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Work {
    title: Option<String>,
    primary_location: Option<Location>,
    authorships: Option<Vec<Authorship>>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
}

#[derive(Debug, Deserialize)]
struct Location {
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    display_name: Option<String>,
}

impl Work {
    fn author_names(&self) -> Vec<String> {
        self.authorships
            .iter()
            .flatten()
            .filter_map(|a| a.author.as_ref()?.display_name.clone())
            .filter(|name| !name.trim().is_empty())
            .collect()
    }

    fn landing_page(&self) -> Option<&str> {
        self.primary_location
            .as_ref()?
            .landing_page_url
            .as_deref()
            .filter(|u| !u.is_empty())
    }
}

/// Source adapter for one journal on OpenAlex.
pub struct OpenAlexAdapter {
    target: JournalTarget,
    settings: HarvestSettings,
    api_base: String,
    politeness_ms: RangeInclusive<u64>,
    backoff: Duration,
}

impl OpenAlexAdapter {
    pub fn new(target: JournalTarget, settings: HarvestSettings) -> Self {
        Self {
            target,
            settings,
            api_base: API_BASE.to_string(),
            politeness_ms: 3000..=5000,
            backoff: Duration::from_secs(1),
        }
    }

    /// The works query for one year and cursor.
    pub fn page_url(&self, year: i32, cursor: &str) -> Result<Url, ScrapeError> {
        let filter = format!(
            "primary_location.source.issn:{},publication_year:{year}",
            self.target.issn
        );
        Url::parse_with_params(
            &self.api_base,
            &[
                ("filter", filter.as_str()),
                ("per-page", PER_PAGE),
                ("select", SELECT),
                ("cursor", cursor),
            ],
        )
        .map_err(|error| ScrapeError::Url {
            url: self.api_base.clone(),
            error,
        })
    }

    /// Every work listed for `year`, following cursors until a page comes
    /// back empty or without a next cursor.
    async fn list_works(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
        year: i32,
    ) -> Result<Vec<Work>, ScrapeError> {
        let mut works = Vec::new();
        let mut cursor = FIRST_CURSOR.to_string();

        loop {
            let Some(page) = self.fetch_page(fetcher, sink, year, &cursor).await? else {
                break;
            };
            let results = page.results.unwrap_or_default();
            if results.is_empty() {
                break;
            }
            debug!(source = %self.target.name, year, works = results.len(), "Fetched works page");
            works.extend(results);

            match page.meta.and_then(|m| m.next_cursor).filter(|c| !c.is_empty()) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(works)
    }

    /// `Ok(None)` when the page could not be fetched.
    async fn fetch_page(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
        year: i32,
        cursor: &str,
    ) -> Result<Option<WorksPage>, ScrapeError> {
        let url = self.page_url(year, cursor)?;
        let mut attempt = 1;

        loop {
            let body = match fetcher.fetch(url.as_str(), NO_HEADERS).await {
                Ok(body) => body,
                Err(failure) => {
                    sink.emit(HarvestEvent::PaginationStopped {
                        source: self.target.name.clone(),
                        year,
                        reason: failure.to_string(),
                    });
                    return Ok(None);
                }
            };

            match serde_json::from_str::<WorksPage>(&body) {
                Ok(page) => return Ok(Some(page)),
                Err(error) if attempt < DECODE_ATTEMPTS => {
                    sink.emit(HarvestEvent::DecodeRetry {
                        source: self.target.name.clone(),
                        year,
                        attempt,
                        reason: error.to_string(),
                    });
                    tokio::time::sleep(self.backoff * attempt as u32).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(ScrapeError::Decode {
                        source_name: self.target.name.clone(),
                        year,
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }

    /// Score one work from its API fields only.
    fn draft(&self, work: Work) -> Draft {
        let title = work.title.clone().unwrap_or_default();
        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default();
        let matched = self.settings.matcher.matches(&title, &abstract_text);
        Draft {
            authors: work.author_names().join(", "),
            url: work.landing_page().unwrap_or_default().to_string(),
            title,
            abstract_text,
            matched,
        }
    }

    /// Complete a draft, consulting its landing page when it needs one.
    async fn finish(&self, fetcher: &dyn PageFetcher, year: i32, mut draft: Draft) -> TaskOutcome {
        if draft.needs_landing_page() {
            let delay = rand::rng().random_range(self.politeness_ms.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;

            match fetcher.fetch(&draft.url, BROWSER_HEADERS).await {
                Ok(body) => {
                    let landing = FieldExtractor::new(&LANDING_RECIPE).extract(&body, "");
                    if draft.abstract_text.is_empty() {
                        draft.abstract_text = landing.abstract_text;
                    }
                    if draft.authors.is_empty() && landing.authors != UNKNOWN_AUTHORS {
                        draft.authors = landing.authors;
                    }
                }
                Err(failure) => {
                    debug!(url = %draft.url, reason = %failure, "Landing page unavailable");
                }
            }
            draft.matched = self
                .settings
                .matcher
                .matches(&draft.title, &draft.abstract_text);
        }

        if draft.authors.is_empty() {
            draft.authors = UNKNOWN_AUTHORS.to_string();
        }

        let record = draft.matched.then(|| PaperRecord {
            source: self.target.name.clone(),
            year,
            title: draft.title,
            authors: draft.authors,
            abstract_text: draft.abstract_text,
            url: draft.url,
        });
        TaskOutcome::Scanned { year, record }
    }
}

/// A work scored from API data, before any landing-page lookup.
#[derive(Debug)]
struct Draft {
    title: String,
    authors: String,
    abstract_text: String,
    url: String,
    matched: bool,
}

impl Draft {
    fn needs_landing_page(&self) -> bool {
        self.matched
            && (self.abstract_text.is_empty() || self.authors.is_empty())
            && !self.url.is_empty()
    }
}

#[async_trait(?Send)]
impl SourceAdapter for OpenAlexAdapter {
    fn name(&self) -> &str {
        &self.target.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.target.name, issn = %self.target.issn))]
    async fn run(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
    ) -> Result<SourceRun, ScrapeError> {
        let name = self.target.name.as_str();
        if self.settings.years.is_empty() {
            return Ok(no_years(name, sink));
        }

        let harvester = Harvester::new(name, LANDING_CONCURRENCY, sink);
        let mut run = SourceRun::with_years(name, &self.settings.years);

        for &year in &self.settings.years {
            let works = self.list_works(fetcher, sink, year).await?;
            sink.emit(HarvestEvent::Discovered {
                source: name.to_string(),
                year,
                candidates: works.len(),
            });

            let drafts: Vec<Draft> = works.into_iter().map(|work| self.draft(work)).collect();
            let (records, stats) = harvester
                .run(year, drafts, |draft| self.finish(fetcher, year, draft))
                .await;
            run.absorb(records, stats);
            year_complete(&run, year, sink);
        }

        Ok(run)
    }
}

#[cfg(test)]
impl OpenAlexAdapter {
    /// Point the adapter at a stub host with no waiting.
    pub(crate) fn for_tests(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self.politeness_ms = 0..=0;
        self.backoff = Duration::ZERO;
        self
    }
}
