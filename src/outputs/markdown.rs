//! Markdown reports, one per (source, year).
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── diffusion-models/            # keyword slug
//!     ├── icml/
//!     │   └── 2024/
//!     │       └── papers.md
//!     └── nature-machine-intelligence/
//!         └── 2024/
//!             └── papers.md
//! ```
//!
//! Only (source, year) pairs with at least one matching paper get a report.

use crate::config::Config;
use crate::models::{PaperRecord, SourceRun, YearStats};
use crate::utils::slugify;
use itertools::Itertools;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Header fields shared by every report of a run.
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub generated_on: &'a str,
    pub keywords: &'a [String],
    pub journals_only: bool,
}

/// Render one report. `records` are written in the order given.
pub fn render_report(
    header: &ReportHeader<'_>,
    source: &str,
    year: i32,
    records: &[&PaperRecord],
    stats: Option<YearStats>,
) -> String {
    let label = if header.journals_only { "Journals" } else { "Conferences" };
    let mut md = format!(
        "# Paper-Tunneling Report\n\
         **Generated on:** {}\n\
         **Keywords:** {}\n\
         **Years:** {year}\n\
         **{label}:** {}\n\n\
         ## {source} {year}\n\n",
        header.generated_on,
        header.keywords.join(", "),
        slugify(source),
    );

    for paper in records {
        md.push_str(&format!(
            "### [{}]({})\n**Authors:** {}\n\n**Abstract:**\n{}\n\n---\n\n",
            paper.title, paper.url, paper.authors, paper.abstract_text
        ));
    }

    md.push_str("\n### Statistics\n");
    if let Some(stats) = stats {
        md.push_str(&stats_line(source, year, stats));
        md.push('\n');
    }
    md
}

/// `[<source> <year>]: Scanned N papers, M found matching keywords.`
pub fn stats_line(source: &str, year: i32, stats: YearStats) -> String {
    format!(
        "[{source} {year}]: Scanned {} papers, {} found matching keywords.",
        stats.scanned, stats.found
    )
}

/// `<output_dir>/<keyword-slug>/<source-slug>/<year>/<output_filename>`
pub fn report_path(config: &Config, source: &str, year: i32) -> PathBuf {
    Path::new(&config.output_dir)
        .join(slugify(&config.keywords.join(" ")))
        .join(slugify(source))
        .join(year.to_string())
        .join(&config.output_filename)
}

/// Write a report for every (source, year) that has matches, records sorted
/// by title. Returns the written paths in source then year order.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir))]
pub async fn write_reports(
    config: &Config,
    runs: &[SourceRun],
    generated_on: &str,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let header = ReportHeader {
        generated_on,
        keywords: &config.keywords,
        journals_only: config.journals_only(),
    };

    let groups = runs
        .iter()
        .flat_map(|run| run.records.iter())
        .into_group_map_by(|r| (r.source.clone(), r.year));

    let mut written = Vec::new();
    for ((source, year), mut records) in groups.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        records.sort_by(|a, b| a.title.cmp(&b.title));
        let stats = runs
            .iter()
            .find(|run| run.source == source)
            .and_then(|run| run.stats.get(&year).copied());

        let path = report_path(config, &source, year);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, render_report(&header, &source, year, &records, stats)).await?;
        info!(path = %path.display(), papers = records.len(), "Report saved");
        written.push(path);
    }

    Ok(written)
}
