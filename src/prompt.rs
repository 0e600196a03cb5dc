//! Prompt-assembly collaborator.
//!
//! Rendered memory ends up verbatim at a `{{memory}}` placeholder inside a
//! larger instruction template owned by the host. [`PromptSink`] is the push
//! contract the engine calls; [`PromptTemplate`] does the substitution for
//! hosts that keep their template alongside the engine.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::memory::UserId;

/// Placeholder replaced with the rendered memory block.
pub const MEMORY_PLACEHOLDER: &str = "{{memory}}";

/// Receives a user's freshly rendered memory block.
#[async_trait]
pub trait PromptSink: Send + Sync {
    /// Push `rendered` (possibly empty) into the user's instruction context.
    async fn sync_prompt(&self, user_id: &UserId, rendered: &str) -> Result<()>;
}

/// Instruction template with `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    vars: BTreeMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            vars: BTreeMap::new(),
        }
    }

    /// Set a variable substituted at `{{name}}`.
    ///
    /// Values may themselves contain placeholders (a persona mentioning
    /// `{{user_name}}`, for example); those are resolved too.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn has_memory_placeholder(&self) -> bool {
        self.template.contains(MEMORY_PLACEHOLDER)
    }

    /// Fill every placeholder, inserting `memory` verbatim last.
    ///
    /// Unknown placeholders are left as-is.
    pub fn fill(&self, memory: &str) -> String {
        let mut text = self.template.clone();
        // Second pass resolves placeholders introduced by variable values
        for _ in 0..2 {
            for (name, value) in &self.vars {
                text = text.replace(&format!("{{{{{}}}}}", name), value);
            }
        }
        text.replace(MEMORY_PLACEHOLDER, memory)
    }
}

/// Sink that fills a template and forwards the full prompt to another sink.
pub struct TemplatedSink<S> {
    template: PromptTemplate,
    inner: S,
}

impl<S: PromptSink> TemplatedSink<S> {
    pub fn new(template: PromptTemplate, inner: S) -> Self {
        Self { template, inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: PromptSink> PromptSink for TemplatedSink<S> {
    async fn sync_prompt(&self, user_id: &UserId, rendered: &str) -> Result<()> {
        let prompt = self.template.fill(rendered);
        self.inner.sync_prompt(user_id, &prompt).await
    }
}
