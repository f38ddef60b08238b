use super::message::{ChatMessage, MessageRole};

/// Bounded conversation history for one interactive session.
///
/// Entry 0 is always the system prompt and is never evicted. After [`trim`]
/// the buffer holds at most `max_len` entries: the system prompt plus at most
/// the `max_len - 1` most recent turns, never starting with an assistant reply.
///
/// [`trim`]: ConversationBuffer::trim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationBuffer {
    entries: Vec<ChatMessage>,
    max_len: usize,
}

impl ConversationBuffer {
    /// Creates a buffer seeded with the system prompt.
    ///
    /// `max_len` is clamped to 1 so the system prompt always fits.
    pub fn new(system_prompt: impl Into<String>, max_len: usize) -> Self {
        Self {
            entries: vec![ChatMessage::new(MessageRole::System, system_prompt)],
            max_len: max_len.max(1),
        }
    }

    /// Appends one entry. Does not trim.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) {
        self.entries.push(ChatMessage::new(role, content));
    }

    /// Drops the oldest non-system entries until the length bound holds.
    ///
    /// An assistant reply left at the head of the conversation is dropped too,
    /// since the question it answered is gone. Returns the number of evicted
    /// entries; zero when already within bound.
    pub fn trim(&mut self) -> usize {
        if self.entries.len() <= self.max_len {
            return 0;
        }
        let mut evicted = self.entries.len() - self.max_len;
        self.entries.drain(1..1 + evicted);
        while self
            .entries
            .get(1)
            .is_some_and(|entry| entry.role == MessageRole::Assistant)
        {
            self.entries.remove(1);
            evicted += 1;
        }
        evicted
    }

    /// Removes every trailing `user` entry, returning how many were removed.
    pub fn pop_trailing_user(&mut self) -> usize {
        let mut removed = 0;
        while self.entries.len() > 1
            && self
                .entries
                .last()
                .is_some_and(|entry| entry.role == MessageRole::User)
        {
            self.entries.pop();
            removed += 1;
        }
        removed
    }

    pub fn system_prompt(&self) -> &str {
        &self.entries[0].content
    }

    /// All entries after the system prompt, in order.
    pub fn conversation(&self) -> &[ChatMessage] {
        &self.entries[1..]
    }

    /// Every entry including the system prompt.
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// A private copy of the conversation, detached from this buffer.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.conversation().to_vec()
    }

    /// Roles of all entries, in order.
    pub fn roles(&self) -> Vec<MessageRole> {
        self.entries.iter().map(|entry| entry.role).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the system prompt is never evicted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}
