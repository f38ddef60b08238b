//! Session titles: a short label generated by the chat model for one segmented
//! session, written next to the session's first log row.

use super::model::{LogRow, Session};
use crate::chat::{ChatClient, ChatRequest};
use crate::config::SetupInfo;
use crate::conversation::ChatMessage;
use crate::error::{ClassChatError, Result};
use crate::log_store::{CellRange, LogStore, TITLE_COLUMN};
use crate::persistence::{RetryNotice, RetryingPersistence};

/// Reads back the log rows of `session`.
pub async fn session_messages(store: &dyn LogStore, session: &Session) -> Result<Vec<LogRow>> {
    let range = CellRange::log_rows(session.row_start, session.row_end);
    let values = store.get(&range).await?;
    Ok(values
        .iter()
        .enumerate()
        .map(|(offset, cells)| LogRow::from_values(session.row_start + offset, cells))
        .filter(|row| !row.is_blank())
        .collect())
}

/// Generates session titles with non-streamed model calls.
pub struct TitleGenerator<'a> {
    client: &'a dyn ChatClient,
    setup: &'a SetupInfo,
    max_chars: usize,
}

impl<'a> TitleGenerator<'a> {
    pub fn new(client: &'a dyn ChatClient, setup: &'a SetupInfo, max_chars: usize) -> Self {
        Self {
            client,
            setup,
            max_chars: max_chars.max(1),
        }
    }

    fn prompt(&self, messages: &[LogRow]) -> String {
        let transcript = messages
            .iter()
            .map(|row| format!("{}: {}", row.role, row.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Write a title of at most {} characters for the following conversation. \
             Reply with the title only.\n\n{transcript}",
            self.max_chars
        )
    }

    /// Asks the model for a title summarizing `messages`.
    pub async fn generate(&self, messages: &[LogRow]) -> Result<String> {
        if messages.is_empty() {
            return Err(ClassChatError::user_input("the session has no messages"));
        }
        let request = ChatRequest {
            model: self.setup.model.clone(),
            max_tokens: self.setup.max_tokens.min(100),
            temperature: self.setup.temperature,
            system: String::new(),
            messages: vec![ChatMessage::user(self.prompt(messages))],
            stream: false,
        };
        let reply = self.client.create_message(request).await?.into_text().await?;
        let title = clean_title(&reply, self.max_chars);
        if title.is_empty() {
            return Err(ClassChatError::remote("the model returned an empty title"));
        }
        tracing::info!(%title, "generated session title");
        Ok(title)
    }
}

/// First non-empty line, unquoted and cut to `max_chars` characters.
fn clean_title(reply: &str, max_chars: usize) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let line = line
        .trim_start_matches(|c| matches!(c, '"' | '\'' | '#' | '*'))
        .trim_end_matches(|c| matches!(c, '"' | '\'' | '*'))
        .trim();
    line.chars().take(max_chars).collect()
}

/// Writes `title` into the title column of the session's first row.
///
/// The write is a cell overwrite, so it is safe to retry.
pub async fn save_session_title<N>(
    store: &dyn LogStore,
    session: &Session,
    title: &str,
    retry: &RetryingPersistence,
    on_retry: N,
) -> Result<()>
where
    N: FnMut(&RetryNotice),
{
    retry
        .persist_with_retry(
            move || store.update_cell(session.row_start, TITLE_COLUMN, title),
            on_retry,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_strips_quotes_and_extra_lines() {
        assert_eq!(clean_title("\n \"Fractions practice\"\nmore", 30), "Fractions practice");
        assert_eq!(clean_title("## Photosynthesis", 30), "Photosynthesis");
    }

    #[test]
    fn test_clean_title_truncates() {
        assert_eq!(clean_title("abcdefghij", 4), "abcd");
        assert_eq!(clean_title("   ", 4), "");
    }
}
