use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::Serialize;

use super::{ parse_reply, status_error, ChatBackend };
use crate::history::Message;
use crate::llm::auth::TokenSigner;
use crate::llm::{ ChatError, LlmConfig };

const DEFAULT_ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_MODEL: &str = "glm-4-flash";

/// Authenticates with a compact signed token rebuilt on every request
/// instead of a static Bearer key. The request body also omits the `stream`
/// flag entirely.
pub struct ZhipuChatClient {
    http: HttpClient,
    signer: TokenSigner,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ZhipuRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

impl ZhipuChatClient {
    pub fn new(
        compound_key: &str,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ChatError> {
        let signer = TokenSigner::from_compound_key(compound_key)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| ChatError::Http { vendor: "zhipu", source })?;

        Ok(Self {
            http,
            signer,
            endpoint: base_url.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key.as_deref().ok_or(ChatError::MissingKey("zhipu"))?;
        Self::new(api_key, config.model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatBackend for ZhipuChatClient {
    async fn send(&self, messages: &[Message]) -> Result<Message, ChatError> {
        let request = ZhipuRequest {
            model: &self.model,
            messages,
        };
        // Fresh token per request; the upstream service tolerates the churn
        // and expects this calling pattern.
        let token = self.signer.sign();
        let resp = self.http
            .post(&self.endpoint)
            .header(AUTHORIZATION, token)
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
        "zhipu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_has_no_stream_field() {
        let messages = vec![Message::user("hello")];
        let request = ZhipuRequest { model: "glm-4-flash", messages: &messages };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stream").is_none());
        assert_eq!(json["model"], "glm-4-flash");
    }

    #[test]
    fn construction_rejects_a_malformed_compound_key() {
        assert!(matches!(
            ZhipuChatClient::new("justonekey", None, None),
            Err(ChatError::MalformedKey)
        ));
    }
}
