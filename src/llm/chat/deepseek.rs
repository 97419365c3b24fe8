use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::Serialize;

use super::{ parse_reply, status_error, ChatBackend };
use crate::history::Message;
use crate::llm::{ ChatError, LlmConfig };

const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";

/// Wire-compatible with the Qwen adapter. What sets this vendor apart is
/// session setup: its system message is assembled from the persona plus the
/// on-disk FAQ and event tables (see `config::knowledge`) before first use.
pub struct DeepSeekChatClient {
    http: HttpClient,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct DeepSeekRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

impl DeepSeekChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?
        );
        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| ChatError::Http { vendor: "deepseek", source })?;

        Ok(Self {
            http,
            endpoint: base_url.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key.clone().ok_or(ChatError::MissingKey("deepseek"))?;
        Self::new(api_key, config.model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatBackend for DeepSeekChatClient {
    async fn send(&self, messages: &[Message]) -> Result<Message, ChatError> {
        let request = DeepSeekRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let resp = self.http
            .post(&self.endpoint)
            .json(&request)
            .send().await
            .map_err(|source| ChatError::Http { vendor: self.vendor(), source })?;

        if !resp.status().is_success() {
            return Err(status_error(self.vendor(), resp).await);
        }
        let body = resp
            .text().await
            .map_err(|source| ChatError::Http { vendor: self.vendor(), source })?;
        parse_reply(self.vendor(), &body)
    }

    fn vendor(&self) -> &'static str {
        "deepseek"
    }
}
