//! Rendering a store into the text block injected at the prompt's memory
//! placeholder.
//!
//! Sections appear in fixed order (permanent, long-term, recent). Short-term
//! facts are shown only if touched within the render window, which is
//! narrower than their storage retention.

use chrono::{DateTime, Duration, Utc};

use crate::config::{DEFAULT_RENDER_WINDOW_DAYS, MAX_RENDER_WINDOW_DAYS};

use super::types::{MemoryStore, Tier};

const HEADER: &str = "# 关于用户的记忆 / Memories about the user\n\
以下是你记住的关于用户的重要信息，对话中自然运用：\n\
Key facts you remember about the user, use them naturally in conversation:";

fn section_title(tier: Tier) -> &'static str {
    match tier {
        Tier::Permanent => "## 基本信息 / About the user",
        Tier::LongTerm => "## 喜好与经历 / Preferences and experiences",
        Tier::ShortTerm => "## 最近 / Recently",
    }
}

/// Render with the default window, relative to the current time.
pub fn render(store: &MemoryStore) -> String {
    render_at(store, Utc::now(), DEFAULT_RENDER_WINDOW_DAYS)
}

/// Render as of `now`, keeping short-term facts touched within `window_days`.
///
/// The window is clamped to `0..=14` days. Returns an empty string when no
/// section has anything to show.
pub fn render_at(store: &MemoryStore, now: DateTime<Utc>, window_days: i64) -> String {
    let window = Duration::days(window_days.clamp(0, MAX_RENDER_WINDOW_DAYS));
    let mut sections = Vec::new();

    for tier in Tier::ALL {
        let lines: Vec<String> = store
            .tier(tier)
            .iter()
            .filter(|item| tier != Tier::ShortTerm || now - item.touched_at() <= window)
            .map(|item| format!("- {}", item.fact))
            .collect();

        if !lines.is_empty() {
            sections.push(format!("{}\n{}", section_title(tier), lines.join("\n")));
        }
    }

    if sections.is_empty() {
        return String::new();
    }
    format!("{}\n\n{}", HEADER, sections.join("\n\n"))
}
