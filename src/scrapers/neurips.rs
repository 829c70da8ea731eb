//! [NeurIPS](https://neurips.cc) virtual conference site.
//!
//! NeurIPS 2025 ran in two physical venues and publishes one listing page
//! per venue; their candidates are unioned. Author lines on paper pages are
//! often bare `·` separated text under the title heading.

use super::virtual_conf::{ConferenceProfile, papers_page};
use crate::extract::{FieldRecipe, Strategy};

/// Venues with their own listing page, by year.
const VENUE_LISTINGS: &[(i32, &[&str])] = &[(2025, &["san-diego", "mexico-city"])];

fn listing_urls(base_url: &str, year: i32) -> Vec<String> {
    match VENUE_LISTINGS.iter().find(|(y, _)| *y == year) {
        Some((_, venues)) => venues
            .iter()
            .map(|venue| format!("{base_url}/virtual/{year}/loc/{venue}/papers.html"))
            .collect(),
        None => papers_page(base_url, year),
    }
}

const TITLE_HEADINGS: &[&str] = &["h4", "h2", "h3"];

static RECIPE: FieldRecipe = FieldRecipe {
    title: &[
        Strategy::Region("h4"),
        Strategy::Region("h2"),
        Strategy::Region("h3"),
    ],
    authors: &[
        Strategy::MetaNameAll("citation_author"),
        Strategy::JsonLdAuthors,
        Strategy::Region("p.authors"),
        Strategy::Region("p.author"),
        Strategy::SeparatedLine {
            headings: TITLE_HEADINGS,
        },
    ],
    abstract_text: &[
        Strategy::Region("#abstract"),
        Strategy::Region(".abstract"),
        Strategy::LabelledSibling {
            tags: "h4, h3, strong",
            label: "Abstract",
        },
    ],
    year: &[],
};

pub static PROFILE: ConferenceProfile = ConferenceProfile {
    name: "NeurIPS",
    base_url: "https://neurips.cc",
    recipe: &RECIPE,
    listing_urls,
};
