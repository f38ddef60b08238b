//! Error types for the ClassChat application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire ClassChat application.
///
/// Remote chat failures, log store failures and local configuration problems all
/// funnel into this enum so the orchestration boundary can decide, in one place,
/// what to roll back and what to show the user.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassChatError {
    /// The chat API did not answer in time.
    #[error("Chat API timed out: {0}")]
    TransportTimeout(String),

    /// The chat API could not be reached.
    #[error("Chat API connection failed: {0}")]
    TransportConnection(String),

    /// The chat API rejected the request because of rate limits.
    #[error("Chat API rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Seconds suggested by the `retry-after` header, when present.
        retry_after_secs: Option<u64>,
    },

    /// The chat API answered with a non-success status code.
    #[error("Chat API status error ({status_code}): {message}")]
    RemoteStatus { status_code: u16, message: String },

    /// Any other chat API failure (malformed payload, error event in a stream, ...).
    #[error("Chat API error: {0}")]
    RemoteGeneric(String),

    /// A remote write still failed after every retry attempt.
    #[error("Persistence failed after {attempts} attempt(s): {message}")]
    Persistence { attempts: u32, message: String },

    /// A log value could not be parsed (e.g. a malformed `HH:MM` timestamp).
    #[error("Parse error: {0}")]
    Parse(String),

    /// The user supplied unusable input (empty nickname, empty message).
    #[error("Invalid input: {0}")]
    UserInput(String),

    /// A new turn was submitted while another one is still in flight.
    #[error("A turn is already being processed")]
    Busy,

    /// The class administrator switched the service off.
    #[error("The chat service is currently switched off")]
    ServiceOff,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates a UserInput error
    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput(message.into())
    }

    /// Creates a RemoteGeneric error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteGeneric(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error came from the chat API boundary.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout(_)
                | Self::TransportConnection(_)
                | Self::RateLimited { .. }
                | Self::RemoteStatus { .. }
                | Self::RemoteGeneric(_)
        )
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Message suitable for showing to a student in the chat window.
    ///
    /// Every chat API failure kind maps to its own wording so the student can tell
    /// a slow service from a broken connection or an exhausted quota.
    pub fn user_message(&self) -> String {
        match self {
            Self::TransportTimeout(_) => {
                "The AI service is taking too long to respond. Please try again in a moment."
                    .to_string()
            }
            Self::TransportConnection(_) => {
                "Could not connect to the AI service. Please check your internet connection."
                    .to_string()
            }
            Self::RateLimited { .. } => {
                "The AI service usage limit has been exceeded. Please try again in a moment."
                    .to_string()
            }
            Self::RemoteStatus {
                status_code,
                message,
            } => format!("The AI service returned an error. Status code: {status_code}, message: {message}"),
            Self::RemoteGeneric(_) => {
                "An error occurred while talking to the AI service. Please try again in a moment."
                    .to_string()
            }
            Self::Persistence { .. } => {
                "Saving to the class sheet failed. Please tell your teacher.".to_string()
            }
            Self::UserInput(message) => message.clone(),
            Self::Busy => "Please wait until the current answer is finished.".to_string(),
            Self::ServiceOff => "The chat bot is resting right now.".to_string(),
            _ => "An unexpected error occurred. Please contact the administrator.".to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ClassChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ClassChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ClassChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used by the shell glue.
impl From<anyhow::Error> for ClassChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ClassChatError>`.
pub type Result<T> = std::result::Result<T, ClassChatError>;
