//! Configuration for ClassChat.
//!
//! Two layers:
//! - [`SetupInfo`]: the class setup published by the class administrator as a flat list of 12
//!   values (sheet URL, service switch, model settings, prompts). Validated once at
//!   load time.
//! - [`AppConfig`]: local settings of this process (`~/.config/classchat/config.toml`).

use crate::error::{ClassChatError, Result};
use crate::persistence::RetryPolicy;
use crate::session::DEFAULT_GAP_MINUTES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of values in a class setup list.
pub const SETUP_VALUE_COUNT: usize = 12;

/// Environment variable overriding the API key of the setup list.
pub const API_KEY_ENV: &str = "CLASSCHAT_API_KEY";

/// Whether the class administrator has the chat bot switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    On,
    Off,
}

/// Validated class setup.
#[derive(Clone, PartialEq)]
pub struct SetupInfo {
    pub sheet_url: String,
    pub service: ServiceState,
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub selector: String,
    pub system_prompt: String,
    /// Prompt asking for an overall evaluation at the end of a session.
    pub evaluation_prompt: String,
    /// Prompt asking for a short teacher's commentary after the evaluation.
    pub commentary_prompt: String,
    pub stream: bool,
}

impl fmt::Debug for SetupInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupInfo")
            .field("sheet_url", &self.sheet_url)
            .field("service", &self.service)
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("selector", &self.selector)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl SetupInfo {
    /// Validates the flat setup list.
    ///
    /// Order: sheet URL, service on/off, provider, API key, model, max tokens,
    /// temperature, selector, system prompt, evaluation prompt, commentary prompt,
    /// streaming flag. Extra trailing values are ignored.
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.len() < SETUP_VALUE_COUNT {
            return Err(ClassChatError::config(format!(
                "expected {SETUP_VALUE_COUNT} setup values, got {}",
                values.len()
            )));
        }
        let value = |index: usize| values[index].as_ref().trim().to_string();

        let service = if value(1).eq_ignore_ascii_case("off") {
            ServiceState::Off
        } else {
            ServiceState::On
        };

        let max_tokens: u32 = value(5).parse().map_err(|_| {
            ClassChatError::config(format!("max tokens must be an integer, got '{}'", value(5)))
        })?;
        if max_tokens == 0 {
            return Err(ClassChatError::config("max tokens must be positive"));
        }

        let temperature: f32 = value(6).parse().map_err(|_| {
            ClassChatError::config(format!("temperature must be a number, got '{}'", value(6)))
        })?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ClassChatError::config(format!(
                "temperature must be a non-negative number, got {temperature}"
            )));
        }

        let setup = Self {
            sheet_url: value(0),
            service,
            provider: value(2),
            api_key: value(3),
            model: value(4),
            max_tokens,
            temperature,
            selector: value(7),
            // Prompts keep their inner formatting.
            system_prompt: values[8].as_ref().to_string(),
            evaluation_prompt: values[9].as_ref().to_string(),
            commentary_prompt: values[10].as_ref().to_string(),
            stream: value(11).eq_ignore_ascii_case("true"),
        };
        setup.validate()?;
        Ok(setup)
    }

    fn validate(&self) -> Result<()> {
        if self.service == ServiceState::Off {
            return Ok(());
        }
        if self.api_key.is_empty() {
            return Err(ClassChatError::config("API key is empty"));
        }
        if self.model.is_empty() {
            return Err(ClassChatError::config("model id is empty"));
        }
        Ok(())
    }

    /// Loads a setup file holding `values = [ ... ]`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClassChatError::config(format!("failed to read setup file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SetupFile = toml::from_str(content)?;
        Self::from_values(&file.values)
    }

    /// Replaces the API key, e.g. from [`API_KEY_ENV`].
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn is_service_on(&self) -> bool {
        self.service == ServiceState::On
    }
}

#[derive(Debug, Deserialize)]
struct SetupFile {
    values: Vec<String>,
}

/// Local settings of this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum buffer length, system prompt included.
    pub history_limit: usize,
    /// Gap, in minutes, that separates two conversational sessions.
    pub session_gap_minutes: u32,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Maximum characters of a generated session title.
    pub title_max_chars: usize,
    /// Class setup file (`values = [...]`).
    pub setup_path: Option<PathBuf>,
    /// JSON snapshot of the local workbook.
    pub workbook_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            session_gap_minutes: DEFAULT_GAP_MINUTES,
            retry_max_attempts: crate::persistence::DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: 1000,
            title_max_chars: 30,
            setup_path: None,
            workbook_path: None,
        }
    }
}

impl AppConfig {
    /// `~/.config/classchat/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ClassChatError::config("could not determine home directory"))?;
        Ok(home.join(".config").join("classchat").join("config.toml"))
    }

    /// Loads the file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(ClassChatError::config("history_limit must be at least 1"));
        }
        if self.retry_max_attempts == 0 {
            return Err(ClassChatError::config("retry_max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn values() -> Vec<String> {
        vec![
            "https://sheets.example/class-3",
            "ON",
            "anthropic",
            "sk-test",
            "claude-3-5-sonnet-20241022",
            "1024",
            "0.7",
            "A",
            "You are a kind tutor.",
            "Evaluate the student.",
            "Write a short comment.",
            "TRUE",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[test]
    fn test_from_values_parses_all_fields() {
        let setup = SetupInfo::from_values(&values()).unwrap();
        assert_eq!(setup.service, ServiceState::On);
        assert_eq!(setup.max_tokens, 1024);
        assert!((setup.temperature - 0.7).abs() < f32::EPSILON);
        assert!(setup.stream);
        assert_eq!(setup.system_prompt, "You are a kind tutor.");
    }

    #[test]
    fn test_stream_flag_is_only_true_for_literal_true() {
        let mut v = values();
        v[11] = "yes".into();
        assert!(!SetupInfo::from_values(&v).unwrap().stream);
        v[11] = "True".into();
        assert!(SetupInfo::from_values(&v).unwrap().stream);
    }

    #[test]
    fn test_missing_values_fail_fast() {
        let v = &values()[..11];
        let err = SetupInfo::from_values(v).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_malformed_numbers_fail_fast() {
        let mut v = values();
        v[5] = "lots".into();
        assert!(SetupInfo::from_values(&v).unwrap_err().is_config());

        let mut v = values();
        v[6] = "warm".into();
        assert!(SetupInfo::from_values(&v).unwrap_err().is_config());
    }

    #[test]
    fn test_service_off_skips_credential_checks() {
        let mut v = values();
        v[1] = "off".into();
        v[3] = String::new();
        let setup = SetupInfo::from_values(&v).unwrap();
        assert!(!setup.is_service_on());

        v[1] = "on".into();
        assert!(SetupInfo::from_values(&v).unwrap_err().is_config());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let setup = SetupInfo::from_values(&values()).unwrap();
        assert!(!format!("{setup:?}").contains("sk-test"));
    }

    #[test]
    fn test_setup_from_toml() {
        let toml = format!(
            "values = [{}]",
            values()
                .iter()
                .map(|v| format!("{v:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let setup = SetupInfo::from_toml_str(&toml).unwrap();
        assert_eq!(setup.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_app_config_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_app_config_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "history_limit = 11\nsession_gap_minutes = 45").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.history_limit, 11);
        assert_eq!(config.session_gap_minutes, 45);
        assert_eq!(config.retry_max_attempts, 3);
    }

    #[test]
    fn test_app_config_rejects_zero_history() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "history_limit = 0").unwrap();
        assert!(AppConfig::load(file.path()).unwrap_err().is_config());
    }
}
