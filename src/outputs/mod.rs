//! Report writers.
//!
//! # Submodules
//!
//! - [`markdown`]: One report per (source, year) with matching papers
//! - [`json`]: A combined `papers.json` with every record and all statistics
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── <keyword-slug>/
//!     ├── papers.json
//!     └── <source-slug>/
//!         └── <year>/
//!             └── papers.md
//! ```

pub mod json;
pub mod markdown;
