use super::processing::ProcessingFlag;
use super::state::{ChatEvent, TurnState};
use crate::chat::{ChatClient, ChatRequest};
use crate::config::SetupInfo;
use crate::conversation::{ChatMessage, ConversationBuffer, MessageRole};
use crate::error::{ClassChatError, Result};
use crate::log_store::{LogStore, Workbook, log_row, log_timestamp};
use crate::persistence::RetryingPersistence;
use chrono::Utc;
use std::sync::Arc;

/// Smallest usable history: the system prompt plus the pending user turn.
const MIN_HISTORY: usize = 2;
/// History limit used when none is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Per-student chat context.
///
/// Created when a student starts chatting under a nickname and dropped when the
/// session ends. Owns the conversation buffer and drives one turn at a time.
pub struct ChatOrchestrator {
    pub(super) setup: SetupInfo,
    pub(super) nickname: String,
    pub(super) client: Arc<dyn ChatClient>,
    pub(super) workbook: Arc<dyn Workbook>,
    pub(super) log: Arc<dyn LogStore>,
    pub(super) buffer: ConversationBuffer,
    pub(super) retry: RetryingPersistence,
    pub(super) processing: ProcessingFlag,
    state: TurnState,
}

impl ChatOrchestrator {
    /// Opens a chat session for `nickname`.
    ///
    /// Fails with `UserInput` for an empty nickname and `ServiceOff` when the
    /// class setup has the service switched off. The student's worksheet is
    /// created from the template on first use.
    pub async fn start(
        setup: SetupInfo,
        nickname: &str,
        client: Arc<dyn ChatClient>,
        workbook: Arc<dyn Workbook>,
    ) -> Result<Self> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ClassChatError::user_input("Please enter a nickname."));
        }
        if !setup.is_service_on() {
            return Err(ClassChatError::ServiceOff);
        }

        tracing::info!(nickname, "starting chat session");
        let log = workbook.get_or_create_worksheet(nickname).await?;
        let buffer = ConversationBuffer::new(setup.system_prompt.clone(), DEFAULT_HISTORY_LIMIT);

        Ok(Self {
            setup,
            nickname: nickname.to_string(),
            client,
            workbook,
            log,
            buffer,
            retry: RetryingPersistence::default(),
            processing: ProcessingFlag::new(),
            state: TurnState::Idle,
        })
    }

    /// Caps the conversation buffer at `limit` entries, system prompt included.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        let mut buffer = ConversationBuffer::new(self.setup.system_prompt.clone(), limit.max(MIN_HISTORY));
        for message in self.buffer.conversation() {
            buffer.append(message.role, message.content.clone());
        }
        buffer.trim();
        self.buffer = buffer;
        self
    }

    /// Replaces the retry wrapper used for summary and title writes.
    pub fn with_retry(mut self, retry: RetryingPersistence) -> Self {
        self.retry = retry;
        self
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn setup(&self) -> &SetupInfo {
        &self.setup
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_set()
    }

    /// Shared view of the processing flag for the shell.
    pub fn processing_flag(&self) -> ProcessingFlag {
        self.processing.clone()
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    /// The conversation as sent on the wire, without the system prompt.
    pub fn messages(&self) -> &[ChatMessage] {
        self.buffer.conversation()
    }

    /// The student's worksheet.
    pub fn log(&self) -> &Arc<dyn LogStore> {
        &self.log
    }

    fn transition<F>(&mut self, next: TurnState, on_event: &mut F)
    where
        F: FnMut(ChatEvent),
    {
        tracing::debug!(from = ?self.state, to = ?next, "turn state");
        self.state = next;
        on_event(ChatEvent::StateChanged(next));
    }

    /// Runs one chat turn and returns the assistant reply.
    ///
    /// On any chat API failure the pending user turn is removed from the buffer
    /// (and from the log sheet), the state returns to `Idle`, and the error is
    /// returned for display.
    pub async fn submit<F>(&mut self, input: &str, mut on_event: F) -> Result<String>
    where
        F: FnMut(ChatEvent) + Send,
    {
        let input = input.trim();
        if input.is_empty() {
            return Err(ClassChatError::user_input("Please enter a message."));
        }
        let _guard = self.processing.try_acquire().ok_or(ClassChatError::Busy)?;

        self.buffer.append(MessageRole::User, input);
        let user_logged = self.log_message(MessageRole::User, input).await;
        let evicted = self.buffer.trim();
        if evicted > 0 {
            tracing::debug!(evicted, "trimmed conversation history");
        }
        self.transition(TurnState::AwaitingModelResponse, &mut on_event);

        match self.request_reply(&mut on_event).await {
            Ok(reply) => {
                self.buffer.append(MessageRole::Assistant, reply.clone());
                self.log_message(MessageRole::Assistant, &reply).await;
                self.transition(TurnState::Idle, &mut on_event);
                Ok(reply)
            }
            Err(err) => {
                tracing::error!(
                    nickname = %self.nickname,
                    transport = err.is_transport(),
                    error = %err,
                    "chat turn failed"
                );
                self.transition(TurnState::Failed, &mut on_event);
                self.unwind_user_turn(user_logged).await;
                self.transition(TurnState::Idle, &mut on_event);
                Err(err)
            }
        }
    }

    async fn request_reply<F>(&mut self, on_event: &mut F) -> Result<String>
    where
        F: FnMut(ChatEvent) + Send,
    {
        let request = self.request(self.buffer.snapshot(), self.setup.stream);
        let response = self.client.create_message(request).await?;

        self.transition(TurnState::Streaming, on_event);
        response
            .collect_with(|delta| on_event(ChatEvent::Delta(delta.to_string())))
            .await
    }

    pub(super) fn request(&self, messages: Vec<ChatMessage>, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.setup.model.clone(),
            max_tokens: self.setup.max_tokens,
            temperature: self.setup.temperature,
            system: self.buffer.system_prompt().to_string(),
            messages,
            stream,
        }
    }

    /// Appends a message row to the student's sheet.
    ///
    /// Appends are not retried (a repeated append duplicates the row); a failure
    /// only costs the log entry, so it is logged and the turn carries on.
    async fn log_message(&self, role: MessageRole, content: &str) -> bool {
        let Some(row) = log_row(role, content, log_timestamp(Utc::now())) else {
            return false;
        };
        match self.log.append_row(row).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(nickname = %self.nickname, %role, error = %err, "failed to log message");
                false
            }
        }
    }

    async fn unwind_user_turn(&mut self, user_logged: bool) {
        let removed = self.buffer.pop_trailing_user();
        tracing::debug!(removed, "rolled back pending user turn");
        if !user_logged {
            return;
        }
        let result = async {
            let last_row = self.log.get_all_values().await?.len();
            if last_row > 0 {
                self.log.delete_rows(last_row).await?;
            }
            Ok::<_, ClassChatError>(())
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(nickname = %self.nickname, error = %err, "failed to remove logged user turn");
        }
    }
}
