//! Incremental decoder for the Messages API event stream.
//!
//! Chunks arrive split at arbitrary byte offsets, so lines are buffered until a
//! newline is seen and events are dispatched on the blank line that ends them.

use classchat_core::chat::StreamEvent;
use classchat_core::error::{ClassChatError, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    MessageStart {},
    ContentBlockStart {},
    ContentBlockDelta { delta: WireDelta },
    ContentBlockStop {},
    MessageDelta {},
    MessageStop {},
    Ping {},
    Error { error: WireError },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Buffers raw bytes and yields the stream events they complete.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event_name: Option<String>,
    data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every event it completes, in order.
    ///
    /// An `error` event from the server is returned as `Err`; `ping` and block
    /// boundary events are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch()? {
                    events.push(event);
                }
            } else if let Some(name) = line.strip_prefix("event:") {
                self.event_name = Some(name.trim().to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(data.strip_prefix(' ').unwrap_or(data));
            }
            // Comment lines (":") and unknown fields are ignored.
        }
        Ok(events)
    }

    fn dispatch(&mut self) -> Result<Option<StreamEvent>> {
        let name = self.event_name.take();
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return Ok(None);
        }

        let wire: WireEvent = serde_json::from_str(&data).map_err(|err| {
            ClassChatError::remote(format!("Malformed stream event {name:?}: {err}"))
        })?;
        let event = match wire {
            WireEvent::MessageStart {} => Some(StreamEvent::MessageStart),
            WireEvent::ContentBlockDelta {
                delta: WireDelta::TextDelta { text },
            } => Some(StreamEvent::ContentBlockDelta { text }),
            WireEvent::MessageDelta {} => Some(StreamEvent::MessageDelta),
            WireEvent::MessageStop {} => Some(StreamEvent::MessageStop),
            WireEvent::Error { error } => return Err(map_stream_error(error)),
            WireEvent::ContentBlockDelta { .. }
            | WireEvent::ContentBlockStart {}
            | WireEvent::ContentBlockStop {}
            | WireEvent::Ping {}
            | WireEvent::Unknown => None,
        };
        tracing::debug!(event = ?name, ?event, "stream event");
        Ok(event)
    }
}

fn map_stream_error(error: WireError) -> ClassChatError {
    tracing::warn!(kind = %error.kind, message = %error.message, "error event in stream");
    match error.kind.as_str() {
        "rate_limit_error" => ClassChatError::RateLimited {
            message: error.message,
            retry_after_secs: None,
        },
        "overloaded_error" => ClassChatError::RemoteStatus {
            status_code: 529,
            message: error.message,
        },
        _ => ClassChatError::remote(format!("{}: {}", error.kind, error.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"role\":\"assistant\"}}\n\
\n\
event: content_block_start\n\
data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\
\n\
event: ping\n\
data: {\"type\": \"ping\"}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\
\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\
\n\
event: content_block_stop\n\
data: {\"type\":\"content_block_stop\",\"index\":0}\n\
\n\
event: message_delta\n\
data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":2}}\n\
\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\
\n";

    fn expected() -> Vec<StreamEvent> {
        vec![
            StreamEvent::MessageStart,
            StreamEvent::ContentBlockDelta {
                text: "Hello".into(),
            },
            StreamEvent::ContentBlockDelta {
                text: " there".into(),
            },
            StreamEvent::MessageDelta,
            StreamEvent::MessageStop,
        ]
    }

    #[test]
    fn test_decodes_full_stream() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(STREAM.as_bytes()).unwrap(), expected());
    }

    #[test]
    fn test_decodes_stream_split_at_arbitrary_offsets() {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in STREAM.as_bytes().chunks(7) {
            events.extend(decoder.push(chunk).unwrap());
        }
        assert_eq!(events, expected());
    }

    #[test]
    fn test_multibyte_text_split_across_chunks() {
        let raw = "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"안녕\"}}\r\n\r\n";
        let bytes = raw.as_bytes();
        let split = raw.find('안').unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(
            decoder.push(&bytes[split..]).unwrap(),
            vec![StreamEvent::ContentBlockDelta {
                text: "안녕".into()
            }]
        );
    }

    #[test]
    fn test_error_event_maps_to_error() {
        let raw = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let err = SseDecoder::new().push(raw.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ClassChatError::RemoteStatus {
                status_code: 529,
                message: "Overloaded".into()
            }
        );

        let raw = "data: {\"type\":\"error\",\"error\":{\"type\":\"rate_limit_error\",\"message\":\"slow down\"}}\n\n";
        let err = SseDecoder::new().push(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, ClassChatError::RateLimited { .. }));
    }

    #[test]
    fn test_malformed_data_is_remote_error() {
        let err = SseDecoder::new().push(b"data: {not json\n\n").unwrap_err();
        assert!(matches!(err, ClassChatError::RemoteGeneric(_)));
    }

    #[test]
    fn test_comments_and_unknown_events_are_ignored() {
        let raw = ": keep-alive\n\nevent: future\ndata: {\"type\":\"something_new\"}\n\n";
        assert!(SseDecoder::new().push(raw.as_bytes()).unwrap().is_empty());
    }
}
