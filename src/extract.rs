//! Layered field extraction from paper detail pages.
//!
//! Each source describes how to recover a paper's title, authors, abstract
//! and year as a [`FieldRecipe`]: one ordered [`Strategy`] list per field.
//! [`FieldExtractor`] walks a list and the first strategy that yields
//! non-empty text wins. Recipes are ordered from most to least reliable:
//!
//! 1. citation meta tags (`citation_author`, `citation_title`, ...)
//! 2. JSON-LD blocks (malformed blocks are skipped)
//! 3. known content regions (`#abstract`, `.authors`, ...)
//! 4. heuristics: the sibling after an "Abstract" heading, or a `·`
//!    separated author line shortly after the title heading
//!
//! Extraction is synchronous and returns owned strings so parsed documents
//! never live across an `.await`.

use crate::models::UNKNOWN_AUTHORS;
use crate::utils::normalize_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Tokens that pollute author lines on conference virtual sites.
const AUTHOR_LINE_NOISE: &[&str] = &["Poster", "OpenReview", "Slides", "Video", "PDF"];

/// How many elements after the title heading are checked for an author line.
const AUTHOR_LINE_WINDOW: usize = 6;

const AUTHOR_SEPARATOR: char = '·';

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(20\d{2})").expect("static regex"));

/// One way of recovering a field from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Content of the first non-empty `<meta name=...>`.
    MetaName(&'static str),
    /// Contents of every non-empty `<meta name=...>`, comma-joined.
    MetaNameAll(&'static str),
    /// Content of the first non-empty `<meta property=...>`.
    MetaProperty(&'static str),
    /// `author` names from `application/ld+json` blocks.
    JsonLdAuthors,
    /// Text of the first non-empty element matching a CSS selector.
    Region(&'static str),
    /// Texts of every element matching a CSS selector, comma-joined.
    RegionList(&'static str),
    /// Text of the element following the first `tags` element containing `label`.
    LabelledSibling {
        tags: &'static str,
        label: &'static str,
    },
    /// A `·` separated line within a few elements after the title heading,
    /// where the heading is the first element found among `headings` (in order).
    SeparatedLine { headings: &'static [&'static str] },
}

/// Per-field strategy lists for one source shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldRecipe {
    pub title: &'static [Strategy],
    pub authors: &'static [Strategy],
    pub abstract_text: &'static [Strategy],
    /// Strategies whose text is searched for a `20xx` year. Empty for sources
    /// whose year comes from discovery.
    pub year: &'static [Strategy],
}

/// Fields recovered from one detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub year: Option<i32>,
}

/// Applies a [`FieldRecipe`] to parsed documents.
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor {
    recipe: &'static FieldRecipe,
}

impl FieldExtractor {
    pub const fn new(recipe: &'static FieldRecipe) -> Self {
        Self { recipe }
    }

    /// Parse `body` and recover every field.
    pub fn extract(&self, body: &str, seed_title: &str) -> ExtractedFields {
        let doc = Html::parse_document(body);
        ExtractedFields {
            title: self.extract_title(&doc, seed_title),
            authors: self.extract_authors(&doc),
            abstract_text: self.extract_abstract(&doc),
            year: self.extract_year(&doc),
        }
    }

    /// The discoverer's anchor text when it has any, otherwise the recipe's
    /// title strategies, otherwise an empty string.
    pub fn extract_title(&self, doc: &Html, seed_title: &str) -> String {
        let seed = normalize_whitespace(seed_title);
        if !seed.is_empty() {
            return seed;
        }
        first_success(doc, self.recipe.title).unwrap_or_default()
    }

    pub fn extract_authors(&self, doc: &Html) -> String {
        first_success(doc, self.recipe.authors).unwrap_or_else(|| UNKNOWN_AUTHORS.to_string())
    }

    pub fn extract_abstract(&self, doc: &Html) -> String {
        first_success(doc, self.recipe.abstract_text).unwrap_or_default()
    }

    pub fn extract_year(&self, doc: &Html) -> Option<i32> {
        self.recipe
            .year
            .iter()
            .filter_map(|s| apply(doc, s))
            .find_map(|text| find_year(&text))
    }
}

/// First `20xx` year mentioned in `text`.
pub fn find_year(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Rebuild a plain abstract from an OpenAlex-style inverted index
/// (word → token positions). Words are ordered by position; gaps and empty
/// words are skipped. When two words claim one position the later key wins.
///
/// Memory is bounded by the number of tokens, not by the largest position.
pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<usize>>) -> String {
    let mut by_position: BTreeMap<usize, &str> = BTreeMap::new();
    for (word, positions) in index {
        for &pos in positions {
            by_position.insert(pos, word.as_str());
        }
    }
    by_position
        .into_values()
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_success(doc: &Html, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| apply(doc, s))
}

fn apply(doc: &Html, strategy: &Strategy) -> Option<String> {
    let text = match *strategy {
        Strategy::MetaName(name) => {
            meta_contents(doc, &format!(r#"meta[name="{name}"]"#)).into_iter().next()
        }
        Strategy::MetaNameAll(name) => {
            join_non_empty(meta_contents(doc, &format!(r#"meta[name="{name}"]"#)))
        }
        Strategy::MetaProperty(property) => {
            meta_contents(doc, &format!(r#"meta[property="{property}"]"#))
                .into_iter()
                .next()
        }
        Strategy::JsonLdAuthors => json_ld_authors(doc),
        Strategy::Region(css) => {
            let selector = parse_selector(css)?;
            doc.select(&selector).map(element_text).find(|t| !t.is_empty())
        }
        Strategy::RegionList(css) => {
            let selector = parse_selector(css)?;
            join_non_empty(doc.select(&selector).map(element_text).collect())
        }
        Strategy::LabelledSibling { tags, label } => labelled_sibling(doc, tags, label),
        Strategy::SeparatedLine { headings } => separated_line(doc, headings),
    }?;
    (!text.is_empty()).then_some(text)
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!(%css, error = ?e, "Invalid selector in recipe");
            None
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn join_non_empty(parts: Vec<String>) -> Option<String> {
    let parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn meta_contents(doc: &Html, css: &str) -> Vec<String> {
    let Some(selector) = parse_selector(css) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .map(normalize_whitespace)
        .filter(|c| !c.is_empty())
        .collect()
}

static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});

fn json_ld_authors(doc: &Html) -> Option<String> {
    doc.select(&LD_JSON).find_map(|script| {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&raw) {
            Ok(data) => join_non_empty(ld_author_names(&data)),
            Err(e) => {
                debug!(error = %e, "Skipping malformed JSON-LD block");
                None
            }
        }
    })
}

fn ld_author_names(data: &Value) -> Vec<String> {
    match data {
        Value::Array(items) => items
            .iter()
            .map(ld_author_names)
            .find(|names| !names.is_empty())
            .unwrap_or_default(),
        Value::Object(obj) => match obj.get("author") {
            Some(Value::Array(authors)) => authors.iter().filter_map(ld_name).collect(),
            Some(author) => ld_name(author).into_iter().collect(),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn ld_name(author: &Value) -> Option<String> {
    let name = match author {
        Value::Object(obj) => obj.get("name")?.as_str()?,
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    let name = normalize_whitespace(name);
    (!name.is_empty()).then_some(name)
}

fn labelled_sibling(doc: &Html, tags: &str, label: &str) -> Option<String> {
    let selector = parse_selector(tags)?;
    let heading = doc
        .select(&selector)
        .find(|el| el.text().collect::<String>().contains(label))?;
    heading
        .next_siblings()
        .find_map(ElementRef::wrap)
        .map(element_text)
}

fn separated_line(doc: &Html, headings: &[&str]) -> Option<String> {
    let heading = headings.iter().find_map(|css| {
        let selector = parse_selector(css)?;
        doc.select(&selector).next()
    })?;

    let heading_id = (*heading).id();
    let after_heading = doc
        .root_element()
        .descendants()
        .skip_while(|node| node.id() != heading_id)
        .skip(1)
        .filter(|node| !node.ancestors().any(|a| a.id() == heading_id))
        .filter_map(ElementRef::wrap);

    for el in after_heading.take(AUTHOR_LINE_WINDOW) {
        if matches!(el.value().name(), "h1" | "h2" | "h3" | "h4") {
            break;
        }
        let text = element_text(el);
        if text.contains(AUTHOR_SEPARATOR) {
            return Some(clean_author_line(&text));
        }
    }
    None
}

/// Drop navigation noise from an author line and turn `·` separators into commas.
pub fn clean_author_line(text: &str) -> String {
    let spaced = text.replace(AUTHOR_SEPARATOR, &format!(" {AUTHOR_SEPARATOR} "));
    let cleaned = spaced
        .split_whitespace()
        .filter(|token| !AUTHOR_LINE_NOISE.contains(token))
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.contains(AUTHOR_SEPARATOR) {
        cleaned
            .split(AUTHOR_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        cleaned
    }
}
