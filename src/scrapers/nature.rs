//! [Nature Machine Intelligence](https://www.nature.com/natmachintell) research articles.
//!
//! The journal lists research articles per year; each article page carries
//! citation meta tags. Requests use browser-like headers because the site
//! rejects obvious bots.
//!
//! The listing's year is not trusted: each article's year is read from its
//! own page and articles outside the configured years are dropped before
//! they are counted.

use super::{HarvestSettings, ScrapeError, SourceAdapter, no_years, year_complete};
use crate::discover::{Discoverer, LinkRule};
use crate::events::EventSink;
use crate::extract::{FieldExtractor, FieldRecipe, Strategy};
use crate::fetch::{BROWSER_HEADERS, PageFetcher};
use crate::harvest::{DetailTask, Harvester, YearPolicy};
use crate::models::SourceRun;
use async_trait::async_trait;
use tracing::instrument;

pub const NAME: &str = "Nature Machine Intelligence";

const BASE_URL: &str = "https://www.nature.com";

static RECIPE: FieldRecipe = FieldRecipe {
    title: &[
        Strategy::MetaName("citation_title"),
        Strategy::MetaProperty("og:title"),
        Strategy::Region("h1"),
    ],
    authors: &[
        Strategy::MetaNameAll("citation_author"),
        Strategy::JsonLdAuthors,
        Strategy::RegionList(".c-article-author-list__item"),
    ],
    abstract_text: &[
        Strategy::MetaName("description"),
        Strategy::MetaProperty("og:description"),
        Strategy::Region(r#"section[data-title="Abstract"]"#),
    ],
    year: &[
        Strategy::MetaName("citation_publication_date"),
        Strategy::MetaName("citation_online_date"),
        Strategy::MetaProperty("article:published_time"),
    ],
};

/// Source adapter for the journal's research-article listing.
pub struct NatureMachineIntelligence {
    settings: HarvestSettings,
    base_url: String,
}

impl NatureMachineIntelligence {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            base_url: BASE_URL.to_string(),
        }
    }

    fn listing_url(&self, year: i32) -> String {
        format!(
            "{}/natmachintell/research-articles?type=article&year={year}",
            self.base_url
        )
    }
}

#[async_trait(?Send)]
impl SourceAdapter for NatureMachineIntelligence {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(level = "info", skip_all, fields(source = NAME))]
    async fn run(
        &self,
        fetcher: &dyn PageFetcher,
        sink: &dyn EventSink,
    ) -> Result<SourceRun, ScrapeError> {
        let years = &self.settings.years;
        if years.is_empty() {
            return Ok(no_years(NAME, sink));
        }

        let discoverer = Discoverer {
            source: NAME,
            fetcher,
            headers: BROWSER_HEADERS,
            sink,
        };
        let harvester = Harvester::new(NAME, self.settings.concurrency, sink);
        let task = DetailTask {
            source: NAME,
            fetcher,
            headers: BROWSER_HEADERS,
            extractor: FieldExtractor::new(&RECIPE),
            matcher: &self.settings.matcher,
            years: YearPolicy::FromPage { configured: years },
        };
        let rule = LinkRule::containing(&["/articles/"]);
        let mut run = SourceRun::with_years(NAME, years);

        for &year in years {
            let candidates = discoverer
                .discover(year, &[self.listing_url(year)], &rule)
                .await;
            let (records, stats) = harvester
                .run(year, candidates, |candidate| task.run(candidate))
                .await;
            run.absorb(records, stats);
            year_complete(&run, year, sink);
        }

        Ok(run)
    }
}
