//! LLM-backed fact extraction.
//!
//! The extractor shows the provider one conversational turn together with
//! everything already remembered, and asks for a JSON object of the form
//!
//! ```json
//! {"new_memories": [{"fact": "...", "type": "permanent|long_term|short_term"}],
//!  "updates": [{"old_fact": "...", "new_fact": "..."}]}
//! ```
//!
//! The reply is untrusted. It is validated against that schema with explicit
//! defaulting, and every failure (transport, timeout, malformed JSON, wrong
//! shape) degrades to `None` from [`FactExtractor::extract`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, CompletionRequest, LLMClient, StopReason};

use super::types::{ExtractionResult, MemoryStore, MemoryUpdate, NewMemory, Tier};

const NEW_MEMORIES_KEY: &str = "new_memories";
const UPDATES_KEY: &str = "updates";

/// Builds extraction prompts and validates the provider's replies.
pub struct FactExtractor {
    client: Arc<dyn LLMClient>,
    config: ExtractorConfig,
}

impl FactExtractor {
    pub fn new(client: Arc<dyn LLMClient>, config: ExtractorConfig) -> Self {
        Self { client, config }
    }

    /// Create an extractor with default settings.
    pub fn with_defaults(client: Arc<dyn LLMClient>) -> Self {
        Self::new(client, ExtractorConfig::default())
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract candidate facts from one turn.
    ///
    /// Returns `None` on any provider or parse failure; callers treat that
    /// the same as "nothing new this turn".
    pub async fn extract(
        &self,
        user_message: &str,
        assistant_reply: &str,
        existing: &MemoryStore,
    ) -> Option<ExtractionResult> {
        match self.try_extract(user_message, assistant_reply, existing).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(error = %e, "Memory extraction failed");
                None
            }
        }
    }

    /// Like [`Self::extract`] but surfaces the failure reason.
    #[instrument(level = "debug", skip_all, fields(model = ?self.config.model))]
    pub async fn try_extract(
        &self,
        user_message: &str,
        assistant_reply: &str,
        existing: &MemoryStore,
    ) -> Result<ExtractionResult> {
        let prompt = self.build_prompt(user_message, assistant_reply, existing);

        let mut request = CompletionRequest::new()
            .with_message(ChatMessage::user(prompt))
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_json_output(true);
        if let Some(ref model) = self.config.model {
            request = request.with_model(model.clone());
        }

        let call = self.client.complete(request);
        let response = match self.config.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), call)
                .await
                .map_err(|_| Error::timeout(ms))??,
            None => call.await?,
        };

        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "Extraction reply received"
        );
        if response.stop_reason == Some(StopReason::MaxTokens) {
            warn!(
                max_tokens = self.config.max_tokens,
                "Extraction reply hit the token limit"
            );
        }
        parse_extraction(&response.content)
    }

    /// Build the extraction instruction for one turn.
    pub fn build_prompt(
        &self,
        user_message: &str,
        assistant_reply: &str,
        existing: &MemoryStore,
    ) -> String {
        let max = self.config.max_turn_chars;
        let summary = existing.summary();
        let summary = if summary.is_empty() {
            "(none yet)".to_string()
        } else {
            summary
        };

        format!(
            r#"You are a memory extraction assistant. Extract key facts worth remembering from this conversation between a user and their AI companion.

User message: {user}
AI reply: {reply}

User's existing memories:
{summary}

Rules:
1. Only extract genuinely useful NEW information about the user. Skip pure chitchat.
2. If the user corrects or updates an existing memory (e.g. "I changed jobs"), output an update whose old_fact is the exact existing text.
3. Keep each fact SHORT (under 20 words), in the SAME language as the user's message.
4. Never store weather, temperatures, prices, news, greetings, goodbyes, or remarks about the AI or this conversation.
5. Categories:
   - permanent: identity, family, pets, job, hometown, birthday, real name (things that rarely change)
   - long_term: hobbies, preferences, important experiences, relationships, habits
   - short_term: recent events, current mood, temporary plans

Return ONLY valid JSON (no markdown, no explanation):
{{"new_memories": [{{"fact": "...", "type": "permanent|long_term|short_term"}}], "updates": [{{"old_fact": "exact old fact text", "new_fact": "updated text"}}]}}

If nothing is worth remembering, return: {{"new_memories": [], "updates": []}}"#,
            user = truncate_chars(user_message.trim(), max),
            reply = truncate_chars(assistant_reply.trim(), max),
        )
    }
}

/// Truncate to at most `max` characters, marking the cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Remove a surrounding markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Validate a provider reply into an [`ExtractionResult`].
///
/// The reply must be a JSON object carrying at least one of the two keys; a
/// missing (or null) key counts as empty. Malformed entries are dropped
/// individually, and a missing or unknown `type` becomes `short_term`.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult> {
    let text = strip_code_fence(raw);
    let value: Value = serde_json::from_str(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidReply("expected a JSON object".to_string()))?;

    if !object.contains_key(NEW_MEMORIES_KEY) && !object.contains_key(UPDATES_KEY) {
        return Err(Error::InvalidReply(format!(
            "missing both `{}` and `{}`",
            NEW_MEMORIES_KEY, UPDATES_KEY
        )));
    }

    let new_memories = entries(object, NEW_MEMORIES_KEY)?
        .iter()
        .filter_map(parse_new_memory)
        .collect();
    let updates = entries(object, UPDATES_KEY)?
        .iter()
        .filter_map(parse_update)
        .collect();

    Ok(ExtractionResult {
        new_memories,
        updates,
    })
}

fn entries<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a [Value]> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(Error::InvalidReply(format!(
            "`{}` should be an array, got {}",
            key,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty_str<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_new_memory(value: &Value) -> Option<NewMemory> {
    let entry = value.as_object()?;
    let fact = non_empty_str(entry, "fact")?;
    let tier = entry
        .get("type")
        .and_then(Value::as_str)
        .and_then(Tier::parse)
        .unwrap_or(Tier::ShortTerm);
    Some(NewMemory::new(fact, tier))
}

fn parse_update(value: &Value) -> Option<MemoryUpdate> {
    let entry = value.as_object()?;
    Some(MemoryUpdate::new(
        non_empty_str(entry, "old_fact")?,
        non_empty_str(entry, "new_fact")?,
    ))
}
