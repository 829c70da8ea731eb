//! Case-insensitive keyword matching over titles and abstracts.

use regex::{RegexSet, RegexSetBuilder};
use tracing::debug;

/// Compiled keyword set.
///
/// An empty keyword list matches nothing. Callers that want every paper must
/// ask for it explicitly with [`KeywordMatcher::accept_all`].
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    patterns: Option<RegexSet>,
    accept_all: bool,
}

impl KeywordMatcher {
    /// Compile `keywords` into a case-insensitive literal pattern set.
    ///
    /// Blank keywords are ignored.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let escaped: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        // Escaped literals always compile; a failure here can only be the size limit.
        let patterns = if escaped.is_empty() {
            None
        } else {
            match RegexSetBuilder::new(&escaped).case_insensitive(true).build() {
                Ok(set) => Some(set),
                Err(e) => {
                    debug!(error = %e, "Keyword set failed to compile; falling back to no matches");
                    None
                }
            }
        };

        Self {
            patterns,
            accept_all: false,
        }
    }

    /// A matcher that accepts every paper.
    pub fn accept_all() -> Self {
        Self {
            patterns: None,
            accept_all: true,
        }
    }

    /// Build the matcher the configuration asks for.
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S], select_all_without_keywords: bool) -> Self {
        let matcher = Self::new(keywords);
        if matcher.patterns.is_none() && select_all_without_keywords {
            Self::accept_all()
        } else {
            matcher
        }
    }

    /// True iff any keyword occurs in `title` or `abstract_text`.
    pub fn matches(&self, title: &str, abstract_text: &str) -> bool {
        if self.accept_all {
            return true;
        }
        match &self.patterns {
            Some(set) => set.is_match(title) || set.is_match(abstract_text),
            None => false,
        }
    }
}
