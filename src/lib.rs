//! # companion-memory
//!
//! Layered long-term memory for companion chat. Completed conversational
//! turns are mined for durable facts about the user, which are kept in a
//! capacity-bounded, time-decaying three-tier store and rendered into a
//! compact block for the model's instruction context.
//!
//! ## Core Components
//!
//! - **Filter**: triage of noise turns and deny-listing of junk facts
//! - **Memory**: tiers, extraction, merge/eviction, expiry sweep, rendering, persistence
//! - **LLM**: the generative-text provider used for extraction
//! - **Orchestrator**: the per-turn pipeline with per-user serialization
//! - **Worker**: bounded background execution off the chat path
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use companion_memory::{
//!     ClientConfig, EngineConfig, GoogleClient, MemoryEngine, MemoryWorker,
//!     SqliteMemoryRepository, Turn,
//! };
//!
//! let client = Arc::new(GoogleClient::new(ClientConfig::from_env_gemini()?)?);
//! let repo = Arc::new(SqliteMemoryRepository::open("memory.db")?);
//! let config = EngineConfig::from_env();
//!
//! let engine = Arc::new(MemoryEngine::new(client, repo, sink, config.clone()));
//! let worker = MemoryWorker::spawn(engine, config.worker);
//!
//! worker.try_submit(Turn::new("user-42", "I just adopted a cat named Miso", "Congrats!"))?;
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod prompt;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::{EngineConfig, ExtractorConfig, WorkerConfig};
pub use error::{Error, Result};
pub use filter::{JunkCategory, JunkClassifier, TriageCategory, TriageFilter};
pub use llm::{ClientConfig, CompletionRequest, CompletionResponse, GoogleClient, LLMClient};
pub use memory::{
    render, sweep, ExtractionResult, FactExtractor, InMemoryRepository, MemoryItem,
    MemoryMerger, MemoryRepository, MemoryStore, MergeReport, SqliteMemoryRepository, Tier,
    UserId,
};
pub use orchestrator::{MemoryEngine, TurnOutcome, UserLocks};
pub use prompt::{PromptSink, PromptTemplate, TemplatedSink};
pub use worker::{MemoryWorker, Turn, WorkerStats};
