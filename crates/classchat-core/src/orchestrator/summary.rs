use super::state::{ChatEvent, SessionSummary};
use super::turn::ChatOrchestrator;
use crate::conversation::ChatMessage;
use crate::error::{ClassChatError, Result};
use crate::log_store::LogStore;

/// Column of the nickname in the summary sheet.
const NICKNAME_COLUMN: usize = 1;
/// Offset from the nickname cell to the evaluation cell.
const EVALUATION_OFFSET: usize = 1;
/// Offset from the nickname cell to the commentary cell.
const COMMENTARY_OFFSET: usize = 2;
const SUMMARY_STEPS: u8 = 2;

impl ChatOrchestrator {
    /// Produces and saves the end-of-session evaluation and commentary.
    ///
    /// Works on a private copy of the transcript; the live buffer is untouched.
    /// A failed evaluation step aborts before the commentary is requested. A
    /// saved evaluation is kept even if the commentary step fails.
    pub async fn end_session<F>(&self, mut on_event: F) -> Result<SessionSummary>
    where
        F: FnMut(ChatEvent) + Send,
    {
        let _guard = self.processing.try_acquire().ok_or(ClassChatError::Busy)?;
        tracing::info!(nickname = %self.nickname, "summarizing session");

        let summary_sheet = self.workbook.summary_sheet().await?;
        let mut transcript = self.buffer.snapshot();

        on_event(ChatEvent::Progress {
            step: 1,
            total: SUMMARY_STEPS,
            finished: false,
        });
        let evaluation = self
            .summary_step(
                &mut transcript,
                &self.setup.evaluation_prompt,
                summary_sheet.as_ref(),
                EVALUATION_OFFSET,
                &mut on_event,
            )
            .await?;
        on_event(ChatEvent::Progress {
            step: 1,
            total: SUMMARY_STEPS,
            finished: true,
        });

        on_event(ChatEvent::Progress {
            step: 2,
            total: SUMMARY_STEPS,
            finished: false,
        });
        let commentary = self
            .summary_step(
                &mut transcript,
                &self.setup.commentary_prompt,
                summary_sheet.as_ref(),
                COMMENTARY_OFFSET,
                &mut on_event,
            )
            .await?;
        on_event(ChatEvent::Progress {
            step: 2,
            total: SUMMARY_STEPS,
            finished: true,
        });

        tracing::info!(nickname = %self.nickname, "session summary saved");
        Ok(SessionSummary {
            evaluation,
            commentary,
        })
    }

    async fn summary_step<F>(
        &self,
        transcript: &mut Vec<ChatMessage>,
        prompt: &str,
        sheet: &dyn LogStore,
        column_offset: usize,
        on_event: &mut F,
    ) -> Result<String>
    where
        F: FnMut(ChatEvent) + Send,
    {
        transcript.push(ChatMessage::user(prompt));
        let request = self.request(transcript.clone(), false);
        let reply = match self.client.create_message(request).await {
            Ok(response) => response.into_text().await,
            Err(err) => Err(err),
        }
        .inspect_err(|err| {
            tracing::error!(nickname = %self.nickname, error = %err, "summary request failed");
        })?;
        transcript.push(ChatMessage::assistant(reply.clone()));

        let nickname = self.nickname.as_str();
        let value = reply.as_str();
        self.retry
            .persist_with_retry(
                move || async move {
                    let cell = sheet
                        .find(nickname, Some(NICKNAME_COLUMN))
                        .await?
                        .ok_or_else(|| ClassChatError::not_found("summary row", nickname))?;
                    sheet.update_cell(cell.row, cell.col + column_offset, value).await
                },
                |notice| on_event(ChatEvent::Warning(notice.describe())),
            )
            .await?;
        Ok(reply)
    }
}
