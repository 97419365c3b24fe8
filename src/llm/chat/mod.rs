pub mod deepseek;
pub mod qwen;
pub mod spark;
pub mod zhipu;

use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use self::deepseek::DeepSeekChatClient;
use self::qwen::QwenChatClient;
use self::spark::SparkChatClient;
use self::zhipu::ZhipuChatClient;
use super::{ ChatError, LlmConfig, LlmType };
use crate::config::prompt::PromptTemplate;
use crate::history::{ ConversationHistory, Message };

/// One vendor's view of the chat contract: build the request, authenticate,
/// post the conversation, parse the reply. Adapters differ only in endpoint,
/// auth material and body shape.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, messages: &[Message]) -> Result<Message, ChatError>;
    fn vendor(&self) -> &'static str;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatBackend>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatBackend> = match config.llm_type {
        LlmType::Qwen => {
            let specific_client = QwenChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Spark => {
            let specific_client = SparkChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Zhipu => {
            let specific_client = ZhipuChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::DeepSeek => {
            let specific_client = DeepSeekChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Message,
}

/// Parses the OpenAI-compatible completion body every vendor here returns.
/// The first choice is authoritative; an absent or empty `choices` array
/// means there is no usable reply.
pub(crate) fn parse_reply(vendor: &'static str, body: &str) -> Result<Message, ChatError> {
    let completion: ChatCompletion = serde_json
        ::from_str(body)
        .map_err(|source| ChatError::BadResponse { vendor, source })?;
    completion.choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(ChatError::EmptyChoices { vendor })
}

pub(crate) async fn status_error(vendor: &'static str, resp: reqwest::Response) -> ChatError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ChatError::Status { vendor, status, body }
}

/// One continuous conversation against one backend. Owns the history
/// exclusively; `post_message` takes `&mut self`, so at most one request per
/// session is in flight and message ordering stays well defined.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    history: ConversationHistory,
    template: PromptTemplate,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, template: PromptTemplate, keep_count: usize) -> Self {
        Self {
            backend,
            history: ConversationHistory::new(keep_count),
            template,
        }
    }

    /// Injects the persona/system message. Called once before the first
    /// user message; the entry is still subject to FIFO eviction later.
    pub fn seed_system(&mut self, content: impl Into<String>) {
        self.history.append(Message::system(content));
    }

    /// Sends one user message and returns the assistant reply. The bound is
    /// enforced against the prior history state, then the templated user
    /// message is appended; on success the reply is appended as well. On
    /// failure the user message stays and the caller may re-issue.
    pub async fn post_message(&mut self, user_text: &str) -> Result<String, ChatError> {
        self.history.evict_to_capacity();
        let prompt = self.template.wrap(user_text);
        self.history.append(Message::user(prompt));

        let started = Instant::now();
        let reply = self.backend.send(self.history.snapshot()).await?;
        info!(
            "{} replied in {:.2}s",
            self.backend.vendor(),
            started.elapsed().as_secs_f64()
        );

        let content = reply.content.clone();
        self.history.append(reply);
        Ok(content)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;

    struct CannedBackend {
        body: String,
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn send(&self, _messages: &[Message]) -> Result<Message, ChatError> {
            parse_reply("canned", &self.body)
        }

        fn vendor(&self) -> &'static str {
            "canned"
        }
    }

    fn session_with(body: &str) -> ChatSession {
        let backend = Arc::new(CannedBackend { body: body.to_string() });
        let template = PromptTemplate::new("a cheerful guide", "English");
        ChatSession::new(backend, template, 15)
    }

    #[tokio::test]
    async fn reply_is_returned_and_recorded() {
        let mut session = session_with(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#
        );
        let reply = session.post_message("hello").await.unwrap();
        assert_eq!(reply, "hi");

        let messages = session.history().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].content.contains("hello"));
        assert!(messages[0].content.contains("a cheerful guide"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "hi");
    }

    #[tokio::test]
    async fn empty_choices_leaves_only_the_user_message() {
        let mut session = session_with(r#"{"choices":[]}"#);
        let err = session.post_message("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyChoices { .. }));

        let messages = session.history().snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn history_turns_over_across_many_messages() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let backend = Arc::new(CannedBackend { body: body.to_string() });
        let template = PromptTemplate::new("persona", "English");
        let mut session = ChatSession::new(backend, template, 4);
        session.seed_system("you are terse");

        for i in 0..5 {
            session.post_message(&format!("turn {}", i)).await.unwrap();
        }

        // 11 messages went in; the seeded system entry rotated out long ago.
        assert!(session.history().len() <= 6);
        assert!(session.history().snapshot().iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn parse_reply_reads_first_choice() {
        let body =
            r#"{"id":"x","created":123,"model":"m",
                "choices":[{"message":{"role":"assistant","content":"one"},"finish_reason":"stop","index":0},
                           {"message":{"role":"assistant","content":"two"},"finish_reason":"stop","index":1}]}"#;
        let message = parse_reply("t", body).unwrap();
        assert_eq!(message.content, "one");
    }

    #[test]
    fn parse_reply_rejects_missing_choices() {
        assert!(matches!(parse_reply("t", r#"{"id":"x"}"#), Err(ChatError::EmptyChoices { .. })));
        assert!(matches!(parse_reply("t", "not json"), Err(ChatError::BadResponse { .. })));
    }
}
