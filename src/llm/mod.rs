//! Generative-text provider abstraction.
//!
//! The memory engine only needs one capability from a model: turn a prompt
//! into text. [`LLMClient`] captures that, and [`GoogleClient`] implements it
//! against the Gemini `generateContent` API.
//!
//! ## Example
//!
//! ```rust,ignore
//! use companion_memory::llm::{
//!     ChatMessage, ClientConfig, CompletionRequest, GoogleClient, LLMClient,
//! };
//!
//! let client = GoogleClient::new(ClientConfig::from_env_gemini()?)?;
//! let request = CompletionRequest::new()
//!     .with_model("gemini-2.5-flash")
//!     .with_message(ChatMessage::user("Hello"));
//!
//! let response = client.complete(request).await?;
//! ```

mod client;
mod types;

pub use client::{ClientConfig, GoogleClient, LLMClient};
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, StopReason, TokenUsage,
};
