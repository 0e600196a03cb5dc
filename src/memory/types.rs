//! Core types for the layered memory store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user a memory store belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Memory tier. Each tier has a fixed capacity and retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Identity-level facts; never expire, never evicted
    Permanent,
    /// Preferences, habits and important experiences
    LongTerm,
    /// Recent events and passing moods
    ShortTerm,
}

impl Tier {
    /// All tiers in storage and rendering order.
    pub const ALL: [Tier; 3] = [Tier::Permanent, Tier::LongTerm, Tier::ShortTerm];

    /// Maximum number of items the tier may hold.
    pub const fn capacity(self) -> usize {
        match self {
            Self::Permanent => 10,
            Self::LongTerm => 15,
            Self::ShortTerm => 5,
        }
    }

    /// Age after which an item is swept, or `None` if the tier never expires.
    pub fn retention(self) -> Option<Duration> {
        match self {
            Self::Permanent => None,
            Self::LongTerm => Some(Duration::days(90)),
            Self::ShortTerm => Some(Duration::days(14)),
        }
    }

    /// Whether overflow evicts the oldest item (true) or rejects the insert (false).
    pub const fn evicts_on_overflow(self) -> bool {
        !matches!(self, Self::Permanent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::LongTerm => "long_term",
            Self::ShortTerm => "short_term",
        }
    }

    /// Parse a tier name as emitted by the extractor.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "permanent" => Some(Self::Permanent),
            "long_term" => Some(Self::LongTerm),
            "short_term" => Some(Self::ShortTerm),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Short statement in the user's own language
    pub fact: String,
    /// When the fact was first stored (immutable)
    pub created_at: DateTime<Utc>,
    /// When the fact was last rewritten; older documents may lack it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryItem {
    pub fn new(fact: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            fact: fact.into(),
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// Last modification time, falling back to creation time.
    pub fn touched_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Rewrite the fact text. `created_at` is left alone.
    pub fn rewrite(&mut self, fact: impl Into<String>, now: DateTime<Utc>) {
        self.fact = fact.into();
        self.updated_at = Some(now.max(self.created_at));
    }

    /// Key used for store-wide duplicate detection.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.fact)
    }
}

/// Normalize fact text for case-insensitive comparison.
pub fn dedup_key(fact: &str) -> String {
    fact.trim().to_lowercase()
}

/// Per-user memory document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    pub permanent: Vec<MemoryItem>,
    pub long_term: Vec<MemoryItem>,
    pub short_term: Vec<MemoryItem>,
    /// Number of completed extraction attempts
    pub extraction_count: u64,
    /// When rendered memory was last pushed to the prompt assembler
    pub last_prompt_sync: Option<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, tier: Tier) -> &[MemoryItem] {
        match tier {
            Tier::Permanent => &self.permanent,
            Tier::LongTerm => &self.long_term,
            Tier::ShortTerm => &self.short_term,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut Vec<MemoryItem> {
        match tier {
            Tier::Permanent => &mut self.permanent,
            Tier::LongTerm => &mut self.long_term,
            Tier::ShortTerm => &mut self.short_term,
        }
    }

    /// Iterate all items with their tier, in tier order then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &MemoryItem)> {
        Tier::ALL
            .into_iter()
            .flat_map(move |tier| self.tier(tier).iter().map(move |item| (tier, item)))
    }

    /// Like [`Self::iter`] but also yields each item's index within its tier.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (Tier, usize, &MemoryItem)> {
        Tier::ALL.into_iter().flat_map(move |tier| {
            self.tier(tier)
                .iter()
                .enumerate()
                .map(move |(index, item)| (tier, index, item))
        })
    }

    /// Total number of facts across all tiers.
    pub fn len(&self) -> usize {
        self.permanent.len() + self.long_term.len() + self.short_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any item, in any tier, has the same text ignoring case.
    pub fn contains_fact(&self, fact: &str) -> bool {
        let key = dedup_key(fact);
        self.iter().any(|(_, item)| item.dedup_key() == key)
    }

    /// Flattened `- [tier] fact` listing, used to give the extractor context.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(tier, item)| format!("- [{}] {}", tier, item.fact))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A fact proposed by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemory {
    pub fact: String,
    pub tier: Tier,
}

impl NewMemory {
    pub fn new(fact: impl Into<String>, tier: Tier) -> Self {
        Self {
            fact: fact.into(),
            tier,
        }
    }
}

/// A proposed rewrite of an existing fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub old_fact: String,
    pub new_fact: String,
}

impl MemoryUpdate {
    pub fn new(old_fact: impl Into<String>, new_fact: impl Into<String>) -> Self {
        Self {
            old_fact: old_fact.into(),
            new_fact: new_fact.into(),
        }
    }
}

/// Validated output of one extraction call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub new_memories: Vec<NewMemory>,
    pub updates: Vec<MemoryUpdate>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, fact: impl Into<String>, tier: Tier) -> Self {
        self.new_memories.push(NewMemory::new(fact, tier));
        self
    }

    pub fn with_update(mut self, old_fact: impl Into<String>, new_fact: impl Into<String>) -> Self {
        self.updates.push(MemoryUpdate::new(old_fact, new_fact));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new_memories.is_empty() && self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tier_policy() {
        assert_eq!(Tier::Permanent.capacity(), 10);
        assert_eq!(Tier::LongTerm.capacity(), 15);
        assert_eq!(Tier::ShortTerm.capacity(), 5);
        assert_eq!(Tier::Permanent.retention(), None);
        assert_eq!(Tier::ShortTerm.retention(), Some(Duration::days(14)));
        assert!(!Tier::Permanent.evicts_on_overflow());
        assert!(Tier::LongTerm.evicts_on_overflow());
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(Tier::parse("long_term"), Some(Tier::LongTerm));
        assert_eq!(Tier::parse(" permanent "), Some(Tier::Permanent));
        assert_eq!(Tier::parse("forever"), None);
    }

    #[test]
    fn test_rewrite_keeps_created_at() {
        let created = Utc::now() - Duration::days(3);
        let mut item = MemoryItem::new("Has a cat", created);
        let now = Utc::now();
        item.rewrite("Has two cats", now);

        assert_eq!(item.fact, "Has two cats");
        assert_eq!(item.created_at, created);
        assert_eq!(item.updated_at, Some(now));
    }

    #[test]
    fn test_contains_fact_ignores_case() {
        let now = Utc::now();
        let mut store = MemoryStore::new();
        store.long_term.push(MemoryItem::new("Loves Jazz", now));

        assert!(store.contains_fact("  loves jazz "));
        assert!(!store.contains_fact("loves rock"));
    }

    #[test]
    fn test_document_shape() {
        let json = r#"{
            "permanent": [{"fact": "Name is Mei", "created_at": "2024-01-01T00:00:00Z"}],
            "extraction_count": 7,
            "last_prompt_sync": null
        }"#;
        let store: MemoryStore = serde_json::from_str(json).unwrap();

        assert_eq!(store.permanent.len(), 1);
        assert!(store.long_term.is_empty());
        assert_eq!(store.extraction_count, 7);
        let item = &store.permanent[0];
        assert_eq!(item.touched_at(), item.created_at);
    }

    #[test]
    fn test_summary_lists_all_tiers() {
        let now = Utc::now();
        let mut store = MemoryStore::new();
        store.permanent.push(MemoryItem::new("Works as a nurse", now));
        store.short_term.push(MemoryItem::new("Has an exam on Friday", now));

        assert_eq!(
            store.summary(),
            "- [permanent] Works as a nurse\n- [short_term] Has an exam on Friday"
        );
    }
}
