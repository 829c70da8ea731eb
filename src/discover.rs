//! Listing-page discovery of candidate detail pages.
//!
//! A source lists one or more pages per year (NeurIPS 2025 has one per
//! venue). Every anchor whose resolved URL satisfies the source's
//! [`LinkRule`] becomes a [`Candidate`]; candidates are unioned across pages
//! and deduplicated by absolute URL, keeping first-seen order.

use crate::events::{EventSink, HarvestEvent};
use crate::fetch::{Headers, PageFetcher};
use crate::utils::normalize_whitespace;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::{debug, instrument};
use url::Url;

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// A detail page to fetch, with the listing's anchor text as fallback title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub seed_title: String,
}

impl Candidate {
    pub fn new(url: &str, seed_title: &str) -> Self {
        Self {
            url: url.to_string(),
            seed_title: seed_title.to_string(),
        }
    }
}

/// Which links on a listing page point at paper detail pages.
#[derive(Debug, Clone)]
pub struct LinkRule {
    /// Every one of these must occur in the URL.
    pub required: Vec<String>,
    /// At least one of these must occur in the URL.
    pub any_of: &'static [&'static str],
}

impl LinkRule {
    /// Poster, oral and spotlight pages of a conference virtual site for `year`.
    pub fn virtual_site(year: i32) -> Self {
        Self {
            required: vec![format!("/virtual/{year}/")],
            any_of: &["/poster/", "/oral/", "/spotlight/"],
        }
    }

    /// Links containing any of `markers`.
    pub fn containing(markers: &'static [&'static str]) -> Self {
        Self {
            required: Vec::new(),
            any_of: markers,
        }
    }

    pub fn accepts(&self, url: &str) -> bool {
        self.required.iter().all(|r| url.contains(r.as_str()))
            && self.any_of.iter().any(|m| url.contains(m))
    }
}

/// Insertion-ordered candidates keyed by URL.
#[derive(Debug, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    /// Add a candidate. A repeated URL contributes nothing, except that an
    /// empty seed title is filled by the first non-empty one seen later.
    pub fn insert(&mut self, candidate: Candidate) {
        match self.index.get(&candidate.url) {
            Some(&i) => {
                let existing = &mut self.items[i];
                if existing.seed_title.is_empty() && !candidate.seed_title.is_empty() {
                    existing.seed_title = candidate.seed_title;
                }
            }
            None => {
                self.index.insert(candidate.url.clone(), self.items.len());
                self.items.push(candidate);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

impl Extend<Candidate> for CandidateSet {
    fn extend<T: IntoIterator<Item = Candidate>>(&mut self, iter: T) {
        for candidate in iter {
            self.insert(candidate);
        }
    }
}

/// Pull every accepted link out of one listing page, resolving relative
/// hrefs against `base`.
pub fn extract_candidates(html: &str, base: &Url, rule: &LinkRule) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHORS)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let resolved = base.join(href).ok()?;
            let url = resolved.to_string();
            rule.accepts(&url).then(|| Candidate {
                url,
                seed_title: normalize_whitespace(&a.text().collect::<Vec<_>>().join(" ")),
            })
        })
        .collect()
}

/// Fetches listing pages for one source.
pub struct Discoverer<'a> {
    pub source: &'a str,
    pub fetcher: &'a dyn PageFetcher,
    pub headers: Headers,
    pub sink: &'a dyn EventSink,
}

impl Discoverer<'_> {
    /// Fetch every listing page for `year` and return the deduplicated
    /// candidates. A listing page that fails to load is reported and skipped.
    #[instrument(level = "info", skip_all, fields(source = %self.source, year = year))]
    pub async fn discover(&self, year: i32, listing_urls: &[String], rule: &LinkRule) -> Vec<Candidate> {
        let mut candidates = CandidateSet::default();

        for listing_url in listing_urls {
            let base = match Url::parse(listing_url) {
                Ok(base) => base,
                Err(e) => {
                    self.listing_failed(year, listing_url, e.to_string());
                    continue;
                }
            };
            match self.fetcher.fetch(listing_url, self.headers).await {
                Ok(body) => {
                    let found = extract_candidates(&body, &base, rule);
                    debug!(url = %listing_url, links = found.len(), "Parsed listing page");
                    candidates.extend(found);
                }
                Err(failure) => self.listing_failed(year, listing_url, failure.to_string()),
            }
        }

        self.sink.emit(HarvestEvent::Discovered {
            source: self.source.to_string(),
            year,
            candidates: candidates.len(),
        });
        candidates.into_vec()
    }

    fn listing_failed(&self, year: i32, url: &str, reason: String) {
        self.sink.emit(HarvestEvent::ListingFailed {
            source: self.source.to_string(),
            year,
            url: url.to_string(),
            reason,
        });
    }
}
