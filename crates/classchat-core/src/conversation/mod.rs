//! Conversation domain module.
//!
//! - `message`: `{role, content}` entries (`MessageRole`, `ChatMessage`)
//! - `buffer`: the bounded per-session history (`ConversationBuffer`)

mod buffer;
mod message;

pub use buffer::ConversationBuffer;
pub use message::{ChatMessage, MessageRole};
