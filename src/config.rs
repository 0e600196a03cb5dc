//! Engine configuration.
//!
//! Every struct here has sensible defaults, `with_*` builders and can be
//! loaded from JSON/TOML through serde, or from the process environment via
//! [`EngineConfig::from_env`].

use serde::{Deserialize, Serialize};

/// Default number of extractions between prompt resyncs.
pub const DEFAULT_SYNC_EVERY_N: u64 = 5;

/// Default recency window (in days) for short-term facts in rendered text.
pub const DEFAULT_RENDER_WINDOW_DAYS: i64 = 3;

/// Upper bound for the render window; short-term facts expire after 14 days.
pub const MAX_RENDER_WINDOW_DAYS: i64 = 14;

/// Default model used for fact extraction.
pub const DEFAULT_EXTRACTION_MODEL: &str = "gemini-2.5-flash";

/// Top-level configuration for [`crate::MemoryEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Push rendered memory downstream every N extractions (when changed)
    pub sync_every_n: u64,
    /// Short-term facts older than this many days are kept but not rendered
    pub render_window_days: i64,
    /// Fact extractor settings
    pub extractor: ExtractorConfig,
    /// Background worker settings
    pub worker: WorkerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_every_n: DEFAULT_SYNC_EVERY_N,
            render_window_days: DEFAULT_RENDER_WINDOW_DAYS,
            extractor: ExtractorConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sync_every_n: env_parse("MEMORY_SYNC_EVERY_N")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.sync_every_n),
            render_window_days: env_parse("MEMORY_RENDER_WINDOW_DAYS")
                .map(|days: i64| days.clamp(0, MAX_RENDER_WINDOW_DAYS))
                .unwrap_or(defaults.render_window_days),
            extractor: ExtractorConfig::from_env(),
            worker: WorkerConfig::from_env(),
        }
    }

    pub fn with_sync_every_n(mut self, n: u64) -> Self {
        self.sync_every_n = n.max(1);
        self
    }

    pub fn with_render_window_days(mut self, days: i64) -> Self {
        self.render_window_days = days.clamp(0, MAX_RENDER_WINDOW_DAYS);
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }
}

/// Settings for the LLM-backed fact extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Model override (None = client default)
    pub model: Option<String>,
    /// Maximum tokens for the extraction reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    /// Each side of the turn is truncated to this many characters
    pub max_turn_chars: usize,
    /// Upper bound on the provider call, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: Some(DEFAULT_EXTRACTION_MODEL.to_string()),
            max_tokens: 1024,
            temperature: 0.2,
            max_turn_chars: 2000,
            timeout_ms: Some(30_000),
        }
    }
}

impl ExtractorConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: std::env::var("MEMORY_EXTRACTION_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .or(defaults.model),
            timeout_ms: env_parse("MEMORY_EXTRACTION_TIMEOUT_MS").or(defaults.timeout_ms),
            ..defaults
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_turn_chars(mut self, chars: usize) -> Self {
        self.max_turn_chars = chars;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Settings for the background worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent worker tasks
    pub workers: usize,
    /// Maximum number of queued turns
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

impl WorkerConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            workers: env_parse("MEMORY_WORKERS").unwrap_or(defaults.workers),
            queue_capacity: env_parse("MEMORY_QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
        }
        .clamped()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Both values are at least 1.
    pub fn clamped(self) -> Self {
        Self {
            workers: self.workers.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sync_every_n, 5);
        assert_eq!(config.render_window_days, 3);
        assert_eq!(config.extractor.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.worker.workers, 4);
    }

    #[test]
    fn test_builders_clamp() {
        let config = EngineConfig::default()
            .with_sync_every_n(0)
            .with_render_window_days(i64::MAX)
            .with_worker(WorkerConfig::default().with_workers(0).with_queue_capacity(0));

        assert_eq!(config.sync_every_n, 1);
        assert_eq!(config.render_window_days, 14);
        assert_eq!(
            EngineConfig::default()
                .with_render_window_days(-2)
                .render_window_days,
            0
        );
        assert_eq!(config.worker.workers, 1);
        assert_eq!(config.worker.queue_capacity, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"sync_every_n": 3, "worker": {"workers": 2}}"#).unwrap();

        assert_eq!(config.sync_every_n, 3);
        assert_eq!(config.render_window_days, 3);
        assert_eq!(config.worker.workers, 2);
        assert_eq!(config.worker.queue_capacity, 256);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }
}
