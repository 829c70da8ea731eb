//! [ICLR](https://iclr.cc) virtual conference site.

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
        Strategy::Region(".author"),
    ],
    abstract_text: &[
        Strategy::Region("#abstract"),
        Strategy::Region(".abstract"),
        Strategy::LabelledSibling {
            tags: "h3, h4, strong",
            label: "Abstract",
        },
    ],
    year: &[],
};

pub static PROFILE: ConferenceProfile = ConferenceProfile {
    name: "ICLR",
    base_url: "https://iclr.cc",
    recipe: &RECIPE,
    listing_urls: papers_page,
};
