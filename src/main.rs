//! # Paper Tunneling
//!
//! Harvests papers matching a set of keywords from machine-learning
//! conference sites and journals, and writes per-venue Markdown reports plus
//! a combined JSON dump.
//!
//! ## Features
//!
//! - Conference virtual sites: ICML, ICLR, NeurIPS
//! - Nature Machine Intelligence research articles
//! - Any journal indexed by OpenAlex, selected by ISSN
//! - Layered extraction of titles, authors, abstracts and years
//! - Per-year scanned/found statistics
//!
//! ## Usage
//!
//! ```sh
//! paper_tunneling --config config.yaml --keywords diffusion --years 2024
//! ```
//!
//! ## Architecture
//!
//! Sources run one after another, each with its own connection pool:
//! 1. **Discovery**: find candidate papers for each configured year
//! 2. **Harvesting**: fetch and extract candidates, a bounded number at a time
//! 3. **Filtering**: keep papers whose title or abstract mentions a keyword
//! 4. **Output**: write Markdown reports and `papers.json`

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod discover;
mod events;
mod extract;
mod fetch;
mod harvest;
mod matcher;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use events::{ProgressSink, TracingSink};
use fetch::HttpFetcher;
use models::SourceRun;
use outputs::{json, markdown};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_tunneling starting up");

    // Parse CLI and layer it over the config file
    let args = Cli::parse();
    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);
    debug!(?config, "Effective configuration");

    let sources = config.build_sources()?;
    info!(
        sources = sources.len(),
        keywords = ?config.keywords,
        years = ?config.years,
        concurrency = config.concurrency,
        "Sources selected"
    );

    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Harvest, one source at a time ----
    let sink = ProgressSink::new(TracingSink);
    let mut runs: Vec<SourceRun> = Vec::with_capacity(sources.len());

    for source in &sources {
        info!(source = %source.name(), "Launching source");
        let fetcher = HttpFetcher::new(config.timeout())?;
        match source.run(&fetcher, &sink).await {
            Ok(run) => {
                let found: u32 = run.stats.values().map(|s| s.found).sum();
                info!(source = %run.source, found, "Source finished");
                runs.push(run);
            }
            Err(e) => error!(source = %source.name(), error = %e, "Source aborted; its results are discarded"),
        }
    }

    let total_found: usize = runs.iter().map(|r| r.records.len()).sum();
    info!(sources = runs.len(), papers = total_found, "Harvest complete");

    // ---- Outputs ----
    let generated_on = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    match markdown::write_reports(&config, &runs, &generated_on).await {
        Ok(paths) => info!(reports = paths.len(), "Markdown reports written"),
        Err(e) => error!(error = %e, "Failed writing Markdown reports"),
    }
    if let Err(e) = json::write_papers(&config, &runs, &generated_on).await {
        error!(error = %e, "Failed to write JSON dump");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
