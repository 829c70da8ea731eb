//! Command-line interface definitions for Paper Tunneling.
//!
//! Everything except the config path is optional: flags given on the
//! command line replace the corresponding config-file values.

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use clap::Parser;

/// Harvest keyword-matching papers from conference sites and journals.
///
/// # Examples
///
/// ```sh
/// # Use config.yaml as is
/// paper_tunneling
///
/// # Override keywords and years for one run
/// paper_tunneling --keywords "diffusion,score matching" --years 2023,2024
///
/// # Journals only, from a different config file
/// paper_tunneling -c journals.yaml --journals nmi,tpami
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, env = "PAPER_TUNNELING_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Comma-separated keywords
    #[arg(short, long, value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Comma-separated publication years
    #[arg(short, long, value_delimiter = ',')]
    pub years: Option<Vec<i32>>,

    /// Comma-separated conference identifiers (icml, iclr, neurips)
    #[arg(long, value_delimiter = ',')]
    pub conferences: Option<Vec<String>>,

    /// Comma-separated journal identifiers (nmi, tpami, jmlr, ...)
    #[arg(long, value_delimiter = ',')]
    pub journals: Option<Vec<String>>,

    /// Detail pages fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Root directory for reports
    #[arg(short, long, env = "PAPER_TUNNELING_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Accept every paper when no keywords are given
    #[arg(long)]
    pub select_all: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(keywords) = &self.keywords {
            config.keywords = trimmed(keywords);
        }
        if let Some(years) = &self.years {
            config.years = years.clone();
        }
        if let Some(conferences) = &self.conferences {
            config.conferences = trimmed(conferences);
        }
        if let Some(journals) = &self.journals {
            config.journals = trimmed(journals);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if self.select_all {
            config.select_all_without_keywords = true;
        }
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["paper_tunneling"]);

        assert_eq!(cli.config, "config.yaml");
        assert!(cli.keywords.is_none());
        assert!(cli.years.is_none());
        assert!(!cli.select_all);
    }

    #[test]
    fn test_cli_comma_lists() {
        let cli = Cli::parse_from([
            "paper_tunneling",
            "--keywords",
            "diffusion, score matching",
            "--years",
            "2023,2024",
            "--journals",
            "nmi,tpami",
        ]);

        assert_eq!(
            cli.keywords.as_deref(),
            Some(&["diffusion".to_string(), " score matching".to_string()][..])
        );
        assert_eq!(cli.years, Some(vec![2023, 2024]));
        assert_eq!(cli.journals, Some(vec!["nmi".to_string(), "tpami".to_string()]));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["paper_tunneling", "-c", "other.yaml", "-o", "/tmp/out"]);

        assert_eq!(cli.config, "other.yaml");
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/out"));
    }

    #[test]
    fn test_apply_overrides_only_given_flags() {
        let mut config = Config {
            keywords: vec!["old".into()],
            conferences: vec!["icml".into()],
            concurrency: 5,
            ..Config::default()
        };
        let cli = Cli::parse_from([
            "paper_tunneling",
            "--keywords",
            "diffusion, score matching,",
            "--timeout",
            "12",
            "--select-all",
        ]);

        cli.apply(&mut config);

        assert_eq!(config.keywords, vec!["diffusion", "score matching"]);
        assert_eq!(config.conferences, vec!["icml"]);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.timeout, 12);
        assert!(config.select_all_without_keywords);
    }

    #[test]
    fn test_invalid_year_is_rejected() {
        assert!(Cli::try_parse_from(["paper_tunneling", "--years", "twenty"]).is_err());
    }
}
