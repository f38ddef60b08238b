//! Core domain of ClassChat, a classroom chat bot.
//!
//! A student chats under a nickname; every turn goes to a hosted model and is
//! logged to the class workbook. Teachers review logs grouped into sessions and
//! collect an end-of-session evaluation per student.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod log_store;
pub mod orchestrator;
pub mod persistence;
pub mod session;

// Re-export common types
pub use error::{ClassChatError, Result};
pub use orchestrator::{ChatEvent, ChatOrchestrator, TurnState};
