//! Per-turn memory pipeline.
//!
//! [`MemoryEngine::process`] runs once per completed conversational turn:
//!
//! 1. TRIAGE: skip turns that carry no information
//! 2. LOAD + SWEEP: read the user's store and drop expired facts
//! 3. EXTRACT: ask the provider for new facts and updates
//! 4. MERGE: apply them under the capacity and dedup rules
//! 5. PERSIST: save the store with the extraction count bumped
//! 6. SYNC: every `sync_every_n` extractions with changes, push the
//!    rendered memory to the prompt sink
//!
//! Turns for the same user are serialized through [`UserLocks`], so rapid
//! consecutive messages cannot overwrite each other's changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter::TriageFilter;
use crate::llm::LLMClient;
use crate::memory::{
    render_at, sweep, FactExtractor, MemoryMerger, MemoryRepository, MemoryStore, UserId,
};
use crate::prompt::PromptSink;

/// What happened to one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Triage judged the turn to be noise; nothing was read or written
    Skipped,
    /// Extraction failed or was unusable; only the count was bumped
    NoExtraction { extraction_count: u64 },
    /// Extraction was merged into the store
    Merged {
        extraction_count: u64,
        has_changes: bool,
        /// Whether rendered memory was pushed to the sink
        synced: bool,
    },
}

/// Keyed async mutexes, one per user with work in flight.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s store.
    pub async fn lock(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the map references are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of users currently tracked (held, awaited or not yet pruned).
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sequences triage, sweep, extraction, merge, persistence and prompt sync.
pub struct MemoryEngine {
    config: EngineConfig,
    triage: TriageFilter,
    extractor: FactExtractor,
    merger: MemoryMerger,
    repository: Arc<dyn MemoryRepository>,
    sink: Arc<dyn PromptSink>,
    locks: UserLocks,
}

impl MemoryEngine {
    pub fn new(
        client: Arc<dyn LLMClient>,
        repository: Arc<dyn MemoryRepository>,
        sink: Arc<dyn PromptSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            extractor: FactExtractor::new(client, config.extractor.clone()),
            triage: TriageFilter::default(),
            merger: MemoryMerger::default(),
            repository,
            sink,
            locks: UserLocks::new(),
            config,
        }
    }

    /// Replace the triage filter.
    pub fn with_triage(mut self, triage: TriageFilter) -> Self {
        self.triage = triage;
        self
    }

    /// Replace the merger (and with it the junk rules).
    pub fn with_merger(mut self, merger: MemoryMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn MemoryRepository> {
        &self.repository
    }

    /// Process one completed turn.
    ///
    /// Provider trouble never surfaces here; only persistence errors do.
    pub async fn process(
        &self,
        user_id: &UserId,
        user_message: &str,
        assistant_reply: &str,
    ) -> Result<TurnOutcome> {
        self.process_at(user_id, user_message, assistant_reply, Utc::now())
            .await
    }

    /// [`Self::process`] with an explicit clock.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn process_at(
        &self,
        user_id: &UserId,
        user_message: &str,
        assistant_reply: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome> {
        if let Some(category) = self.triage.classify(user_message) {
            debug!(?category, "Turn skipped by triage");
            return Ok(TurnOutcome::Skipped);
        }

        let _guard = self.locks.lock(user_id).await;

        let mut store = self.repository.load(user_id).await?.unwrap_or_default();
        sweep(&mut store, now);

        let Some(extracted) = self
            .extractor
            .extract(user_message, assistant_reply, &store)
            .await
        else {
            store.extraction_count += 1;
            self.repository.save(user_id, &store).await?;
            return Ok(TurnOutcome::NoExtraction {
                extraction_count: store.extraction_count,
            });
        };

        let report = self.merger.merge(&mut store, extracted, now);
        store.extraction_count += 1;
        let count = store.extraction_count;
        self.repository.save(user_id, &store).await?;

        let every = self.config.sync_every_n.max(1);
        let mut synced = false;
        if report.has_changes && count % every == 0 {
            synced = self.push(user_id, &mut store, now).await?;
            if synced {
                info!(count, "Synced prompt");
            }
        } else if report.has_changes {
            info!(
                count,
                next_sync = count + (every - count % every),
                "Changes saved, prompt sync deferred"
            );
        }

        Ok(TurnOutcome::Merged {
            extraction_count: count,
            has_changes: report.has_changes,
            synced,
        })
    }

    /// Render the user's current memory without modifying anything.
    pub async fn snapshot(&self, user_id: &UserId) -> Result<String> {
        let now = Utc::now();
        let mut store = self.repository.load(user_id).await?.unwrap_or_default();
        sweep(&mut store, now);
        Ok(render_at(&store, now, self.config.render_window_days))
    }

    /// Push the user's memory to the sink now, regardless of the sync cadence.
    ///
    /// Fails if the push fails; `last_prompt_sync` is only stamped on success.
    pub async fn resync(&self, user_id: &UserId) -> Result<()> {
        let _guard = self.locks.lock(user_id).await;
        let now = Utc::now();

        let mut store = self.repository.load(user_id).await?.unwrap_or_default();
        sweep(&mut store, now);

        let rendered = render_at(&store, now, self.config.render_window_days);
        self.sink.sync_prompt(user_id, &rendered).await?;

        store.last_prompt_sync = Some(now);
        self.repository.save(user_id, &store).await?;
        info!(%user_id, "Prompt resynced");
        Ok(())
    }

    /// Render and push; a sink failure is logged and reported as `false`.
    async fn push(
        &self,
        user_id: &UserId,
        store: &mut MemoryStore,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let rendered = render_at(store, now, self.config.render_window_days);
        if let Err(e) = self.sink.sync_prompt(user_id, &rendered).await {
            error!(error = %e, "Prompt sync failed");
            return Ok(false);
        }

        store.last_prompt_sync = Some(now);
        self.repository.save(user_id, store).await?;
        Ok(true)
    }
}
