pub mod fastapi;
pub mod gradio;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use self::fastapi::FastApiTtsClient;
use self::gradio::GradioTtsClient;
use crate::audio::{ AudioBuffer, AudioError };
use crate::cli::Args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsType {
    FastApi,
    Gradio,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseTtsTypeError {
    message: String,
}

impl fmt::Display for ParseTtsTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseTtsTypeError {}

impl FromStr for TtsType {
    type Err = ParseTtsTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastapi" => Ok(TtsType::FastApi),
            "gradio" => Ok(TtsType::Gradio),
            _ =>
                Err(ParseTtsTypeError {
                    message: format!("Invalid TTS type: '{}'", s),
                }),
        }
    }
}

/// Synthesis language, carried in requests either as a short API code or as
/// the label the job-submission endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
    Japanese,
    ChineseEnglishMix,
    JapaneseEnglishMix,
    MultiLingual,
}

impl Language {
    pub fn api_code(&self) -> &'static str {
        match self {
            Language::Chinese | Language::ChineseEnglishMix => "zh",
            Language::English => "en",
            Language::Japanese | Language::JapaneseEnglishMix => "ja",
            Language::MultiLingual => "auto",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Chinese => "Chinese",
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::ChineseEnglishMix => "ChineseEnglishMix",
            Language::JapaneseEnglishMix => "JapaneseEnglishMix",
            Language::MultiLingual => "MultiLingual",
        }
    }
}

impl FromStr for Language {
    type Err = ParseTtsTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" => Ok(Language::Chinese),
            "en" | "english" => Ok(Language::English),
            "ja" | "japanese" => Ok(Language::Japanese),
            "chineseenglishmix" => Ok(Language::ChineseEnglishMix),
            "japaneseenglishmix" => Ok(Language::JapaneseEnglishMix),
            "auto" | "multilingual" => Ok(Language::MultiLingual),
            _ =>
                Err(ParseTtsTypeError {
                    message: format!("Invalid language: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("tts request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tts server returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("reference audio and reference text are required before speaking")]
    MissingReference,
    #[error("synthesis job produced no file after {0} submissions")]
    ExhaustedRetries(u32),
    #[error("could not read reference audio: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio decode failed: {0}")]
    Audio(#[from] AudioError),
}

/// The speech contract: one call, one decoded buffer. On failure the caller
/// keeps the original text and decides what to do with the silence.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    async fn speak(&self, text: &str) -> Result<AudioBuffer, TtsError>;
}

pub fn new_client(args: &Args) -> Result<Arc<dyn TtsBackend>, Box<dyn StdError + Send + Sync>> {
    let tts_type: TtsType = args.tts_type.parse()?;
    let client: Arc<dyn TtsBackend> = match tts_type {
        TtsType::FastApi => Arc::new(FastApiTtsClient::from_args(args)?),
        TtsType::Gradio => Arc::new(GradioTtsClient::from_args(args)?),
    };
    Ok(client)
}
