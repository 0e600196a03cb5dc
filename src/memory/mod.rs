//! Layered per-user memory.
//!
//! Facts about a user live in three tiers with different capacities and
//! lifetimes:
//!
//! - **Permanent**: identity-level facts; never expire, inserts are rejected when full
//! - **LongTerm**: preferences and experiences; expire after 90 days, oldest evicted when full
//! - **ShortTerm**: recent events; expire after 14 days, oldest evicted when full
//!
//! Each turn flows through [`sweep`], [`FactExtractor`], [`MemoryMerger`] and,
//! periodically, [`render`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use companion_memory::memory::{render, ExtractionResult, MemoryMerger, MemoryStore, Tier};
//!
//! let mut store = MemoryStore::new();
//! let result = ExtractionResult::new()
//!     .with_memory("Has a cat named Mochi", Tier::Permanent)
//!     .with_memory("Started learning guitar", Tier::LongTerm);
//!
//! let report = MemoryMerger::default().merge(&mut store, result, chrono::Utc::now());
//! assert!(report.has_changes);
//!
//! println!("{}", render(&store));
//! ```

mod extract;
mod merge;
mod proptest;
mod render;
mod schema;
mod store;
mod sweep;
mod types;

pub use extract::{parse_extraction, strip_code_fence, FactExtractor};
pub use merge::{MemoryMerger, MergeReport};
pub use render::{render, render_at};
pub use schema::{get_schema_version, initialize_schema, is_initialized, SCHEMA_VERSION};
pub use store::{InMemoryRepository, MemoryRepository, SqliteMemoryRepository};
pub use sweep::sweep;
pub use types::{
    dedup_key, ExtractionResult, MemoryItem, MemoryStore, MemoryUpdate, NewMemory, Tier, UserId,
};
