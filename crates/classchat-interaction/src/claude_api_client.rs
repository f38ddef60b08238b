//! ClaudeApiClient - Direct REST client for the Anthropic Messages API.
//!
//! Non-streamed requests are answered with one JSON body; streamed requests are
//! decoded from server-sent events as they arrive.

use crate::sse::SseDecoder;
use async_trait::async_trait;
use bytes::Bytes;
use classchat_core::chat::{ChatClient, ChatRequest, ChatResponse, StreamEvent};
use classchat_core::config::SetupInfo;
use classchat_core::conversation::{ChatMessage, MessageRole};
use classchat_core::error::{ClassChatError, Result};
use futures::{StreamExt, stream};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const SUPPORTED_PROVIDERS: [&str; 2] = ["anthropic", "claude"];

/// Client that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl ClaudeApiClient {
    /// Creates a new client with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a client from the class setup.
    ///
    /// Only the Anthropic provider is supported; an empty provider name is
    /// treated as Anthropic.
    pub fn from_setup(setup: &SetupInfo) -> Result<Self> {
        let provider = setup.provider.trim();
        if !provider.is_empty()
            && !SUPPORTED_PROVIDERS
                .iter()
                .any(|p| p.eq_ignore_ascii_case(provider))
        {
            return Err(ClassChatError::config(format!(
                "Unsupported chat provider '{provider}'"
            )));
        }
        if setup.api_key.trim().is_empty() {
            return Err(ClassChatError::config("The API key is empty"));
        }
        Ok(Self::new(setup.api_key.trim()))
    }

    /// Overrides the endpoint (e.g. for a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Time limit for a non-streamed request. Streams are only bounded per chunk
    /// by the connection itself.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send_request(&self, body: &CreateMessageRequest<'_>) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body);
        if !body.stream {
            builder = builder.timeout(self.timeout);
        }

        let response = builder.send().await.map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for ClaudeApiClient {
    async fn create_message(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = CreateMessageRequest::from_request(&request);
        tracing::debug!(
            model = %request.model,
            messages = body.messages.len(),
            stream = request.stream,
            "sending chat request"
        );
        let response = self.send_request(&body).await?;

        if request.stream {
            return Ok(ChatResponse::Stream(decode_events(response.bytes_stream())));
        }

        let parsed: CreateMessageResponse = response.json().await.map_err(|err| {
            ClassChatError::remote(format!("Failed to parse Claude response: {err}"))
        })?;
        extract_text_response(parsed).map(ChatResponse::Message)
    }
}

/// Turns a raw byte stream into typed stream events.
fn decode_events<S>(bytes: S) -> classchat_core::chat::EventStream
where
    S: futures::Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let mut decoder = SseDecoder::new();
    bytes
        .map(move |chunk| match chunk {
            Ok(chunk) => decoder.push(&chunk),
            Err(err) => Err(map_transport_error(err)),
        })
        .flat_map(|batch| {
            let items: Vec<Result<StreamEvent>> = match batch {
                Ok(events) => events.into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            stream::iter(items)
        })
        .boxed()
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

impl<'a> CreateMessageRequest<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(WireMessage::from)
                .collect(),
            stream: request.stream,
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .collect();
    if text.is_empty() {
        return Err(ClassChatError::remote(
            "Claude API returned no text in the response content",
        ));
    }
    Ok(text)
}

fn map_transport_error(err: reqwest::Error) -> ClassChatError {
    if err.is_timeout() {
        ClassChatError::TransportTimeout(err.to_string())
    } else if err.is_connect() {
        ClassChatError::TransportConnection(err.to_string())
    } else {
        ClassChatError::remote(format!("Claude API request failed: {err}"))
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ClassChatError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(retry_after = ?retry_after, "Claude API rate limit hit");
        return ClassChatError::RateLimited {
            message,
            retry_after_secs: retry_after.map(|d| d.as_secs()),
        };
    }
    ClassChatError::RemoteStatus {
        status_code: status.as_u16(),
        message,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
