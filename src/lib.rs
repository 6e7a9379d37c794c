//! Rule-driven structured data extraction from HTML
//!
//! A ruleset describes the shape of the output and where each field lives:
//! - CSS selectors, with `::attr(name)` for attribute values
//! - Objects, lists and regex captures
//! - Per-field exclusion of sub-trees (`_removeSelectors`)
//! - Named transformation pipelines (text cleanup, casts, dates, URLs)
//!
//! Rulesets are bound once into an [`Extractor`] and shared across threads.

pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod ffi;
pub mod rules;
pub mod transform;
pub mod value;

pub use config::{load_ruleset, parse_ruleset, ruleset_from_json};
pub use error::{ConfigError, TransformError};
pub use extractor::{extract, extract_html, Extraction, Extractor, FieldFailure};
pub use ffi::*;
pub use rules::{RegexGroup, RegexSpec, Rule, RuleKind, TransformationSpec};
pub use transform::{Input, Params, Registry, Transformation};
pub use value::Value;
