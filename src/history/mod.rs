use serde::{ Deserialize, Serialize };

/// Who authored a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered, size-bounded message log for one chat session.
///
/// Eviction is FIFO by position regardless of role, so a seeded system
/// message rotates out once the bound turns over. The bound is checked
/// against the prior state before the next user message is appended, not
/// after, so the freshly appended message is never the one evicted.
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    keep_count: usize,
}

impl ConversationHistory {
    pub fn new(keep_count: usize) -> Self {
        Self { messages: Vec::new(), keep_count }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drops oldest entries until the length is back within the bound.
    pub fn evict_to_capacity(&mut self) {
        while self.messages.len() > self.keep_count {
            self.messages.remove(0);
        }
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn keep_count(&self) -> usize {
        self.keep_count
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(15)
    }
}
