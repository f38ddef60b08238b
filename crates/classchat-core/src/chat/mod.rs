//! Chat API boundary.
//!
//! The orchestrator talks to the hosted model only through [`ChatClient`]. A call
//! yields either one complete message or a finite, non-restartable stream of typed
//! [`StreamEvent`]s.

use crate::conversation::ChatMessage;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt, future};

/// One request to the chat API.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sent as the dedicated system parameter, never as a message.
    pub system: String,
    /// The conversation without the system entry.
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Lifecycle events of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    MessageStart,
    ContentBlockDelta { text: String },
    MessageDelta,
    MessageStop,
}

/// Lazy sequence of stream events. Consumed once.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Reply to a [`ChatRequest`].
pub enum ChatResponse {
    /// A complete, non-streamed reply.
    Message(String),
    /// A streamed reply.
    Stream(EventStream),
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatResponse::Message(text) => f.debug_tuple("Message").field(text).finish(),
            ChatResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl ChatResponse {
    /// Assembles the full reply text, feeding every delta to `on_delta`.
    ///
    /// A complete message is delivered to `on_delta` in one piece.
    pub async fn collect_with<F>(self, on_delta: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        match self {
            ChatResponse::Message(text) => {
                let mut on_delta = on_delta;
                on_delta(&text);
                Ok(text)
            }
            ChatResponse::Stream(stream) => collect_stream(stream, on_delta).await,
        }
    }

    /// Assembles the full reply text.
    pub async fn into_text(self) -> Result<String> {
        self.collect_with(|_| {}).await
    }
}

/// Folds a stream into the reply text, stopping at the first `MessageStop`.
///
/// Events after `MessageStop` are never polled. An error event aborts the fold.
pub async fn collect_stream<F>(stream: EventStream, mut on_delta: F) -> Result<String>
where
    F: FnMut(&str) + Send,
{
    stream
        .take_while(|event| future::ready(!matches!(event, Ok(StreamEvent::MessageStop))))
        .try_fold(String::new(), |mut text, event| {
            if let StreamEvent::ContentBlockDelta { text: delta } = event {
                on_delta(&delta);
                text.push_str(&delta);
            }
            future::ready(Ok(text))
        })
        .await
}

/// A client of the hosted chat model.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one request. Streaming is honoured when `request.stream` is set.
    async fn create_message(&self, request: ChatRequest) -> Result<ChatResponse>;
}
