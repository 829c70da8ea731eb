//! Concurrency-bounded detail harvesting.
//!
//! [`Harvester::run`] drives one future per work item with at most
//! `concurrency` in flight. Each future resolves to a [`TaskOutcome`]; the
//! outcomes are folded in completion order by a single reducer that owns the
//! records and the statistics, so tasks never share mutable state.

use crate::discover::Candidate;
use crate::events::{EventSink, HarvestEvent};
use crate::extract::FieldExtractor;
use crate::fetch::{Headers, PageFetcher};
use crate::matcher::KeywordMatcher;
use crate::models::{PaperRecord, StatsTable};
use futures::stream::{self, StreamExt};
use std::future::Future;

/// Default number of detail pages fetched at once.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// What a single task contributes to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Nothing was fetched; no counters move.
    FetchFailed { url: String, reason: String },
    /// Fetched but discarded before counting.
    Dropped { url: String, reason: String },
    /// Examined for `year`; `record` is set iff it matched.
    Scanned {
        year: i32,
        record: Option<PaperRecord>,
    },
}

/// Runs batches of tasks for one source under a fixed concurrency ceiling.
pub struct Harvester<'a> {
    source: &'a str,
    concurrency: usize,
    sink: &'a dyn EventSink,
}

impl<'a> Harvester<'a> {
    pub fn new(source: &'a str, concurrency: usize, sink: &'a dyn EventSink) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            sink,
        }
    }

    /// Run `work` over every item and fold the outcomes.
    ///
    /// `year` only labels progress events; statistics are keyed by the year
    /// each outcome reports.
    pub async fn run<I, F, Fut>(
        &self,
        year: i32,
        items: Vec<I>,
        work: F,
    ) -> (Vec<PaperRecord>, StatsTable)
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = TaskOutcome>,
    {
        let total = items.len();
        let mut outcomes = stream::iter(items)
            .map(work)
            .buffer_unordered(self.concurrency);

        let mut records = Vec::new();
        let mut stats = StatsTable::new();
        let mut completed = 0usize;

        while let Some(outcome) = outcomes.next().await {
            completed += 1;
            self.reduce(outcome, &mut records, &mut stats);
            self.sink.emit(HarvestEvent::TaskCompleted {
                source: self.source.to_string(),
                year,
                completed,
                total,
            });
        }

        (records, stats)
    }

    fn reduce(&self, outcome: TaskOutcome, records: &mut Vec<PaperRecord>, stats: &mut StatsTable) {
        match outcome {
            TaskOutcome::FetchFailed { url, reason } => {
                self.sink.emit(HarvestEvent::FetchFailed {
                    source: self.source.to_string(),
                    url,
                    reason,
                });
            }
            TaskOutcome::Dropped { url, reason } => {
                self.sink.emit(HarvestEvent::Dropped {
                    source: self.source.to_string(),
                    url,
                    reason,
                });
            }
            TaskOutcome::Scanned { year, record } => {
                stats.entry(year).or_default().record_scan(record.is_some());
                if let Some(record) = record {
                    self.sink.emit(HarvestEvent::MatchFound {
                        source: self.source.to_string(),
                        year,
                        title: record.title.clone(),
                    });
                    records.push(record);
                }
            }
        }
    }
}

/// Where a detail page's year comes from.
#[derive(Debug, Clone, Copy)]
pub enum YearPolicy<'a> {
    /// The year the page was discovered under.
    Listing(i32),
    /// The year recovered from the page itself. Pages without one fall back to
    /// the first configured year; pages outside a non-empty configured set are
    /// dropped.
    FromPage { configured: &'a [i32] },
}

impl YearPolicy<'_> {
    fn resolve(&self, recovered: Option<i32>) -> Result<i32, String> {
        match *self {
            YearPolicy::Listing(year) => Ok(year),
            YearPolicy::FromPage { configured } => {
                let year = recovered
                    .or_else(|| configured.first().copied())
                    .ok_or_else(|| "no publication year".to_string())?;
                if !configured.is_empty() && !configured.contains(&year) {
                    return Err(format!("year {year} outside configured years"));
                }
                Ok(year)
            }
        }
    }
}

/// Everything a detail-page task needs besides its candidate.
pub struct DetailTask<'a> {
    pub source: &'a str,
    pub fetcher: &'a dyn PageFetcher,
    pub headers: Headers,
    pub extractor: FieldExtractor,
    pub matcher: &'a KeywordMatcher,
    pub years: YearPolicy<'a>,
}

impl DetailTask<'_> {
    /// Fetch, extract and match one candidate.
    pub async fn run(&self, candidate: Candidate) -> TaskOutcome {
        let body = match self.fetcher.fetch(&candidate.url, self.headers).await {
            Ok(body) => body,
            Err(failure) => {
                return TaskOutcome::FetchFailed {
                    url: candidate.url,
                    reason: failure.to_string(),
                };
            }
        };

        let fields = self.extractor.extract(&body, &candidate.seed_title);
        let year = match self.years.resolve(fields.year) {
            Ok(year) => year,
            Err(reason) => {
                return TaskOutcome::Dropped {
                    url: candidate.url,
                    reason,
                };
            }
        };

        let record = self
            .matcher
            .matches(&fields.title, &fields.abstract_text)
            .then(|| PaperRecord {
                source: self.source.to_string(),
                year,
                title: fields.title,
                authors: fields.authors,
                abstract_text: fields.abstract_text,
                url: candidate.url,
            });

        TaskOutcome::Scanned { year, record }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::recording::RecordingSink;
    use crate::extract::{FieldRecipe, Strategy};
    use crate::fetch::stub::StubFetcher;
    use crate::fetch::{FetchFailure, NO_HEADERS};
    use crate::models::YearStats;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RECIPE: FieldRecipe = FieldRecipe {
        title: &[Strategy::Region("h1")],
        authors: &[Strategy::MetaNameAll("citation_author")],
        abstract_text: &[Strategy::Region("#abstract")],
        year: &[Strategy::MetaName("citation_publication_date")],
    };

    fn scanned(year: i32, title: Option<&str>) -> TaskOutcome {
        TaskOutcome::Scanned {
            year,
            record: title.map(|t| PaperRecord {
                source: "Test".into(),
                year,
                title: t.into(),
                authors: "A".into(),
                abstract_text: String::new(),
                url: format!("https://t.test/{t}"),
            }),
        }
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_respected() {
        let sink = RecordingSink::default();
        let harvester = Harvester::new("Test", 2, &sink);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let (_, stats) = harvester
            .run(2024, (0..8).collect(), |_| {
                let in_flight = &in_flight;
                let peak = &peak;
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    for _ in 0..3 {
                        tokio::task::yield_now().await;
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    scanned(2024, None)
                }
            })
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(stats[&2024], YearStats::new(8, 0));
    }

    #[tokio::test]
    async fn test_fast_tasks_are_not_blocked_by_slow_ones() {
        let sink = RecordingSink::default();
        let harvester = Harvester::new("Test", 2, &sink);
        let (records, _) = harvester
            .run(2024, vec![("slow", 10), ("fast", 0)], |(name, yields)| async move {
                for _ in 0..yields {
                    tokio::task::yield_now().await;
                }
                scanned(2024, Some(name))
            })
            .await;

        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_reducer_counts_and_emits() {
        let sink = RecordingSink::default();
        let harvester = Harvester::new("Test", 4, &sink);
        let outcomes = vec![
            scanned(2024, Some("hit")),
            scanned(2024, None),
            TaskOutcome::FetchFailed {
                url: "https://t.test/down".into(),
                reason: "timed out".into(),
            },
            TaskOutcome::Dropped {
                url: "https://t.test/old".into(),
                reason: "year 2019 outside configured years".into(),
            },
        ];
        let (records, stats) = harvester
            .run(2024, outcomes, |o| async move { o })
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&2024], YearStats::new(2, 1));

        let events = sink.events();
        let completed = events
            .iter()
            .filter(|e| matches!(e, HarvestEvent::TaskCompleted { total: 4, .. }))
            .count();
        assert_eq!(completed, 4);
        assert!(events.iter().any(|e| matches!(e, HarvestEvent::FetchFailed { .. })));
        assert!(events.iter().any(|e| matches!(e, HarvestEvent::Dropped { .. })));
        assert!(events.iter().any(|e| matches!(e, HarvestEvent::MatchFound { .. })));
    }

    #[tokio::test]
    async fn test_detail_task_fetch_failure_yields_no_record() {
        let fetcher = StubFetcher::new().failing("https://t.test/p", FetchFailure::Timeout);
        let matcher = KeywordMatcher::new(&["x"]);
        let task = DetailTask {
            source: "Test",
            fetcher: &fetcher,
            headers: NO_HEADERS,
            extractor: FieldExtractor::new(&RECIPE),
            matcher: &matcher,
            years: YearPolicy::Listing(2024),
        };
        let outcome = task
            .run(Candidate::new("https://t.test/p", "x marks the spot"))
            .await;
        assert_eq!(
            outcome,
            TaskOutcome::FetchFailed {
                url: "https://t.test/p".into(),
                reason: "timed out".into()
            }
        );
    }

    #[tokio::test]
    async fn test_detail_task_year_from_page() {
        let page = |date: &str| {
            format!(
                r#"<head><meta name="citation_publication_date" content="{date}"></head>
                <body><h1>Robust RL</h1><div id="abstract">Policy learning.</div></body>"#
            )
        };
        let fetcher = StubFetcher::new()
            .page("https://t.test/new", &page("2024/03/01"))
            .page("https://t.test/old", &page("2019/03/01"))
            .page("https://t.test/none", "<h1>Robust RL</h1>");
        let matcher = KeywordMatcher::new(&["policy"]);
        let configured = [2024, 2023];
        let task = DetailTask {
            source: "Test",
            fetcher: &fetcher,
            headers: NO_HEADERS,
            extractor: FieldExtractor::new(&RECIPE),
            matcher: &matcher,
            years: YearPolicy::FromPage {
                configured: &configured,
            },
        };

        match task.run(Candidate::new("https://t.test/new", "")).await {
            TaskOutcome::Scanned {
                year: 2024,
                record: Some(r),
            } => {
                assert_eq!(r.title, "Robust RL");
                assert_eq!(r.abstract_text, "Policy learning.");
                assert_eq!(r.authors, crate::models::UNKNOWN_AUTHORS);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            task.run(Candidate::new("https://t.test/old", "")).await,
            TaskOutcome::Dropped { .. }
        ));
        assert!(matches!(
            task.run(Candidate::new("https://t.test/none", "")).await,
            TaskOutcome::Scanned {
                year: 2024,
                record: None
            }
        ));
    }

    #[test]
    fn test_year_policy_without_configured_years() {
        let policy = YearPolicy::FromPage { configured: &[] };
        assert_eq!(policy.resolve(Some(2021)), Ok(2021));
        assert!(policy.resolve(None).is_err());
        assert_eq!(YearPolicy::Listing(2022).resolve(Some(2001)), Ok(2022));
    }
}
