//! Combined JSON dump of a run.
//!
//! Every matching record from every source plus the per-source, per-year
//! statistics are written to `<output_dir>/<keyword-slug>/papers.json`.

use crate::config::Config;
use crate::models::{PaperRecord, SourceRun, StatsTable};
use crate::utils::slugify;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const PAPERS_JSON: &str = "papers.json";

/// Serialized shape of `papers.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PapersDump {
    pub generated_on: String,
    pub keywords: Vec<String>,
    pub years: Vec<i32>,
    pub papers: Vec<PaperRecord>,
    /// Statistics keyed by source name, then year.
    pub stats: BTreeMap<String, StatsTable>,
}

impl PapersDump {
    pub fn new(config: &Config, runs: &[SourceRun], generated_on: &str) -> Self {
        Self {
            generated_on: generated_on.to_string(),
            keywords: config.keywords.clone(),
            years: config.years.clone(),
            papers: runs.iter().flat_map(|r| r.records.iter().cloned()).collect(),
            stats: runs
                .iter()
                .map(|r| (r.source.clone(), r.stats.clone()))
                .collect(),
        }
    }
}

pub fn dump_path(config: &Config) -> PathBuf {
    Path::new(&config.output_dir)
        .join(slugify(&config.keywords.join(" ")))
        .join(PAPERS_JSON)
}

/// Write the combined dump, creating the keyword directory as needed.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir))]
pub async fn write_papers(
    config: &Config,
    runs: &[SourceRun],
    generated_on: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let dump = PapersDump::new(config, runs, generated_on);
    let json = serde_json::to_string_pretty(&dump)?;

    let path = dump_path(config);
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), papers = dump.papers.len(), "Wrote JSON dump");
    Ok(path)
}
