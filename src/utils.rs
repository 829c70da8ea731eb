//! Utility functions for string cleanup and file system checks.
//!
//! - Whitespace normalisation for text pulled out of HTML
//! - Truncation and slugification for logs and report paths
//! - Output directory validation

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  Deep \n\t Learning "), "Deep Learning");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and suffixed with an ellipsis and
/// the number of bytes dropped. Cuts always land on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Lowercase `text` and join its words with hyphens; empty input becomes `"all"`.
///
/// Used for report directory names, e.g. keywords `["Large", "Language Model"]`
/// land under `large-language-model/`.
pub fn slugify(text: &str) -> String {
    let slug = text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "all".to_string() } else { slug }
}

/// Create `path` if needed and prove it accepts new files.
///
/// Run before any network work so a bad output directory fails fast.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let marker = Path::new(path).join(".paper_tunneling_write_check");
    fs::write(&marker, b"").await?;
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(marker = %marker.display(), error = %e, "Could not remove write check file");
    }
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Deep \n\t Learning "), "Deep Learning");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ééé", 2);
        assert_eq!(result, "éé…(+2 bytes)");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Large Language  Model"), "large-language-model");
        assert_eq!(slugify("Nature Machine Intelligence"), "nature-machine-intelligence");
        assert_eq!(slugify(""), "all");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let path = nested.to_str().unwrap();
        ensure_writable_dir(path).await.unwrap();
        assert!(nested.is_dir());
        assert!(std::fs::read_dir(&nested).unwrap().next().is_none());
    }
}
