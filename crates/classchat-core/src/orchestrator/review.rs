use super::turn::ChatOrchestrator;
use crate::error::Result;
use crate::persistence::RetryNotice;
use crate::session::{Session, SessionSegmenter, TitleGenerator, save_session_title, session_messages};

impl ChatOrchestrator {
    /// Segments the student's whole log into conversational sessions.
    pub async fn sessions(&self, segmenter: &SessionSegmenter) -> Result<Vec<Session>> {
        let values = self.log.get_all_values().await?;
        let sessions = segmenter.segment_values(&values);
        tracing::debug!(rows = values.len(), sessions = sessions.len(), "segmented log");
        Ok(sessions)
    }

    /// Generates a title for `session` and saves it next to its first row.
    pub async fn title_session<N>(&self, session: &Session, max_chars: usize, on_retry: N) -> Result<String>
    where
        N: FnMut(&RetryNotice),
    {
        let messages = session_messages(self.log.as_ref(), session).await?;
        let title = TitleGenerator::new(self.client.as_ref(), &self.setup, max_chars)
            .generate(&messages)
            .await?;
        save_session_title(self.log.as_ref(), session, &title, &self.retry, on_retry).await?;
        Ok(title)
    }
}
