//! Chat API clients for ClassChat.
//!
//! `claude_api_client` talks to the Anthropic Messages API over HTTP and turns
//! server-sent events into the typed [`classchat_core::chat::StreamEvent`]s the
//! orchestrator consumes.

pub mod claude_api_client;
pub mod sse;

pub use claude_api_client::ClaudeApiClient;
pub use sse::SseDecoder;
