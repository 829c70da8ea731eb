//! [ICML](https://icml.cc) virtual conference site.
//!
//! Paper pages carry the abstract in a `.abstract` block; authors appear in
//! one of several author containers when citation meta tags are missing.

use super::virtual_conf::{ConferenceProfile, papers_page};
use crate::extract::{FieldRecipe, Strategy};

static RECIPE: FieldRecipe = FieldRecipe {
    title: &[
        Strategy::Region("h4"),
        Strategy::Region("h2"),
        Strategy::Region("h3"),
    ],
    authors: &[
        Strategy::MetaNameAll("citation_author"),
        Strategy::JsonLdAuthors,
        Strategy::Region(".authors"),
        Strategy::Region(".author-block"),
        Strategy::Region(".authors-list"),
        Strategy::Region(".author"),
    ],
    abstract_text: &[
        Strategy::Region(".abstract"),
        Strategy::Region("#abstract"),
        Strategy::LabelledSibling {
            tags: "h3, h4, strong",
            label: "Abstract",
        },
    ],
    year: &[],
};

pub static PROFILE: ConferenceProfile = ConferenceProfile {
    name: "ICML",
    base_url: "https://icml.cc",
    recipe: &RECIPE,
    listing_urls: papers_page,
};
