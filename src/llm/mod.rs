pub mod auth;
pub mod chat;

use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Qwen,
    Spark,
    Zhipu,
    DeepSeek,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}

impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qwen" => Ok(LlmType::Qwen),
            "spark" => Ok(LlmType::Spark),
            "zhipu" => Ok(LlmType::Zhipu),
            "deepseek" => Ok(LlmType::DeepSeek),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Qwen,
            api_key: None,
            model: None,
            base_url: None,
        }
    }
}

/// Everything that can go wrong talking to a chat vendor. All of these are
/// recoverable at the session level: the conversation state survives and the
/// caller may simply re-issue the message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to {vendor} failed: {source}")]
    Http {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{vendor} returned status {status}: {body}")]
    Status {
        vendor: &'static str,
        status: u16,
        body: String,
    },
    #[error("{vendor} response contained no choices")]
    EmptyChoices { vendor: &'static str },
    #[error("{vendor} response was not valid JSON: {source}")]
    BadResponse {
        vendor: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("API key is required for {0}")]
    MissingKey(&'static str),
    #[error("compound API key must look like '<id>.<secret>'")]
    MalformedKey,
    #[error("API key is not a valid header value")]
    BadKeyFormat(#[from] reqwest::header::InvalidHeaderValue),
}
