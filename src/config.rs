//! Run configuration and the source registry.
//!
//! Settings come from a YAML file (default `config.yaml`) and may be
//! overridden from the command line. The registry turns the configured
//! conference and journal identifiers into source adapters:
//!
//! | Kind | Identifier | Adapter |
//! |------|------------|---------|
//! | Conference | `icml`, `iclr`, `neurips` | virtual conference site |
//! | Journal | `nmi`, `nature_machine_intelligence` | Nature Machine Intelligence |
//! | Journal | `tpami`, `jmlr`, `tnnls`, `pr`, `aij`, or any `journal_targets` key | OpenAlex by ISSN |
//!
//! ```yaml
//! keywords: [diffusion, "graph neural network"]
//! years: [2023, 2024]
//! conferences: [icml, neurips]
//! journals: [nmi, tpami]
//! journal_targets:
//!   tmlr: { name: Transactions on Machine Learning Research, issn: 2835-8856 }
//! ```

use crate::fetch::DEFAULT_TIMEOUT_SECS;
use crate::harvest::DEFAULT_CONCURRENCY;
use crate::matcher::KeywordMatcher;
use crate::scrapers::nature::NatureMachineIntelligence;
use crate::scrapers::openalex::{JournalTarget, OpenAlexAdapter};
use crate::scrapers::virtual_conf::{ConferenceProfile, VirtualConference};
use crate::scrapers::{HarvestSettings, SourceAdapter, iclr, icml, neurips};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Journals resolved through OpenAlex without any `journal_targets` entry.
const BUILTIN_JOURNALS: &[(&str, &str, &str)] = &[
    ("tpami", "IEEE Transactions on Pattern Analysis and Machine Intelligence", "0162-8828"),
    ("jmlr", "Journal of Machine Learning Research", "1532-4435"),
    ("tnnls", "IEEE Transactions on Neural Networks and Learning Systems", "2162-237X"),
    ("pr", "Pattern Recognition", "0031-3203"),
    ("aij", "Artificial Intelligence", "0004-3702"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no valid conference or journal selected")]
    NoSources,
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub keywords: Vec<String>,
    pub years: Vec<i32>,
    pub conferences: Vec<String>,
    pub journals: Vec<String>,
    /// Detail pages fetched at once within a year.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub output_dir: String,
    pub output_filename: String,
    /// Accept every paper when `keywords` is empty.
    pub select_all_without_keywords: bool,
    /// Extra OpenAlex journals, keyed by identifier.
    pub journal_targets: BTreeMap<String, JournalTarget>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            years: Vec::new(),
            conferences: Vec::new(),
            journals: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT_SECS,
            output_dir: "results".to_string(),
            output_filename: "papers.md".to_string(),
            select_all_without_keywords: false,
            journal_targets: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Read and parse a YAML config file. A missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null rather than an empty map.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Reports are labelled "Journals" only when no conference was selected.
    pub fn journals_only(&self) -> bool {
        !self.journals.is_empty() && self.conferences.is_empty()
    }

    pub fn matcher(&self) -> KeywordMatcher {
        KeywordMatcher::from_keywords(&self.keywords, self.select_all_without_keywords)
    }

    fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings::new(self.years.clone(), self.matcher()).with_concurrency(self.concurrency)
    }

    /// Build one adapter per recognised identifier, conferences first.
    /// Unknown identifiers are logged and skipped, as are identifiers that
    /// resolve to a source already selected (aliases, repeated ISSNs).
    pub fn build_sources(&self) -> Result<Vec<Box<dyn SourceAdapter>>, ConfigError> {
        let settings = self.harvest_settings();
        let mut sources: Vec<Box<dyn SourceAdapter>> = Vec::new();
        let mut selected = HashSet::new();

        for id in &self.conferences {
            let Some(profile) = conference_profile(&normalize_id(id)) else {
                warn!(conference = %id, "Unknown conference; skipping");
                continue;
            };
            if !selected.insert(SourceKey::Conference(profile.name)) {
                warn!(conference = %id, "Conference selected twice; skipping repeat");
                continue;
            }
            sources.push(Box::new(VirtualConference::new(profile, settings.clone())));
        }

        for id in &self.journals {
            let key = normalize_id(id);
            if matches!(key.as_str(), "nmi" | "nature_machine_intelligence") {
                if selected.insert(SourceKey::Nature) {
                    sources.push(Box::new(NatureMachineIntelligence::new(settings.clone())));
                } else {
                    warn!(journal = %id, "Journal selected twice; skipping repeat");
                }
                continue;
            }
            let Some(target) = self.journal_target(&key) else {
                warn!(journal = %id, "Unknown journal; skipping");
                continue;
            };
            if !selected.insert(SourceKey::Issn(target.issn.trim().to_uppercase())) {
                warn!(journal = %id, issn = %target.issn, "Journal selected twice; skipping repeat");
                continue;
            }
            sources.push(Box::new(OpenAlexAdapter::new(target, settings.clone())));
        }

        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        Ok(sources)
    }

    /// A configured target wins over a built-in one with the same key.
    fn journal_target(&self, key: &str) -> Option<JournalTarget> {
        if let Some(target) = self.journal_targets.get(key) {
            return Some(target.clone());
        }
        BUILTIN_JOURNALS
            .iter()
            .find(|(id, _, _)| *id == key)
            .map(|(_, name, issn)| JournalTarget::new(name, issn))
    }
}

/// What makes two selected identifiers the same source.
#[derive(Debug, PartialEq, Eq, Hash)]
enum SourceKey {
    Conference(&'static str),
    Nature,
    Issn(String),
}

fn conference_profile(key: &str) -> Option<&'static ConferenceProfile> {
    match key {
        "icml" => Some(&icml::PROFILE),
        "iclr" => Some(&iclr::PROFILE),
        "neurips" => Some(&neurips::PROFILE),
        _ => None,
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = Config::from_yaml("keywords: [diffusion]\nyears: [2024]\n").unwrap();
        assert_eq!(config.keywords, vec!["diffusion"]);
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.output_dir, "results");
        assert_eq!(config.output_filename, "papers.md");
        assert!(!config.select_all_without_keywords);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(matches!(
            Config::from_yaml("years: [not, numbers"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "conferences: [ICML]\nconcurrency: 4\ntimeout: 10").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.conferences, vec!["ICML"]);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout, 10);
    }

    #[test]
    fn test_registry_builds_known_sources_and_skips_unknown() {
        let config = Config {
            years: vec![2024],
            conferences: vec!["ICML".into(), "kdd".into(), "neurips".into()],
            journals: vec!["nature_machine_intelligence".into(), "jmlr".into(), "nope".into()],
            ..Config::default()
        };
        let names: Vec<_> = config
            .build_sources()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "ICML",
                "NeurIPS",
                "Nature Machine Intelligence",
                "Journal of Machine Learning Research",
            ]
        );
    }

    #[test]
    fn test_registry_skips_repeated_sources() {
        let yaml = r#"
conferences: [icml, " ICML ", neurips]
journals: [nmi, nature_machine_intelligence, tpami, tpami_alias]
journal_targets:
  tpami_alias: { name: TPAMI, issn: 0162-8828 }
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let names: Vec<_> = config
            .build_sources()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "ICML",
                "NeurIPS",
                "Nature Machine Intelligence",
                "IEEE Transactions on Pattern Analysis and Machine Intelligence",
            ]
        );
    }

    #[test]
    fn test_journal_targets_extend_and_override_builtins() {
        let yaml = r#"
journals: [tmlr, pr]
journal_targets:
  tmlr: { name: TMLR, issn: 2835-8856 }
  pr: { name: Pattern Recognition (override), issn: 0031-3203 }
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let names: Vec<_> = config
            .build_sources()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["TMLR", "Pattern Recognition (override)"]);
    }

    #[test]
    fn test_no_valid_source_is_an_error() {
        let config = Config {
            conferences: vec!["kdd".into()],
            ..Config::default()
        };
        assert!(matches!(config.build_sources(), Err(ConfigError::NoSources)));
    }

    #[test]
    fn test_journals_only_label() {
        let mut config = Config {
            journals: vec!["nmi".into()],
            ..Config::default()
        };
        assert!(config.journals_only());
        config.conferences.push("icml".into());
        assert!(!config.journals_only());
    }

    #[test]
    fn test_select_all_without_keywords() {
        let mut config = Config::default();
        assert!(!config.matcher().matches("anything", ""));
        config.select_all_without_keywords = true;
        assert!(config.matcher().matches("anything", ""));
    }
}
