//! Rule-table filters applied around fact extraction.
//!
//! - [`TriageFilter`] runs on the raw user message and short-circuits turns
//!   that are pure small talk, before any network call is made.
//! - [`JunkClassifier`] runs on extractor output and drops facts that should
//!   never be remembered (weather, news, greetings, remarks about the assistant).
//!
//! Both are ordered lists of `(category, regex)` rules and can be extended
//! with `with_rule` without touching merge logic.

mod junk;
mod triage;

pub use junk::{JunkCategory, JunkClassifier, JunkRule};
pub use triage::{TriageCategory, TriageFilter, TriageRule, MIN_CONTENT_CHARS};
