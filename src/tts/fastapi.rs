use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::Serialize;

use super::{ Language, TtsBackend, TtsError };
use crate::audio::wav;
use crate::audio::AudioBuffer;
use crate::cli::Args;

/// Direct synthesis: one POST describing the reference and target text, one
/// response carrying raw WAV bytes.
pub struct FastApiTtsClient {
    http: HttpClient,
    endpoint: String,
    refer_wav_path: String,
    reference_text: String,
    reference_language: Language,
    target_language: Language,
    /// Used when the response body arrives as headerless PCM.
    fallback_sample_rate: u32,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    refer_wav_path: &'a str,
    prompt_text: &'a str,
    prompt_language: &'a str,
    text: &'a str,
    text_language: &'a str,
}

impl FastApiTtsClient {
    pub fn from_args(args: &Args) -> Result<Self, TtsError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            endpoint: args.tts_base_url.clone(),
            refer_wav_path: args.tts_refer_wav_path.clone(),
            reference_text: args.tts_reference_text.clone(),
            reference_language: args.tts_reference_language,
            target_language: args.tts_target_language,
            fallback_sample_rate: args.tts_sample_rate,
        })
    }
}

#[async_trait]
impl TtsBackend for FastApiTtsClient {
    async fn speak(&self, text: &str) -> Result<AudioBuffer, TtsError> {
        let request = SynthesisRequest {
            refer_wav_path: &self.refer_wav_path,
            prompt_text: &self.reference_text,
            prompt_language: self.reference_language.api_code(),
            text,
            text_language: self.target_language.api_code(),
        };

        let resp = self.http.post(&self.endpoint).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TtsError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        info!("tts: received {} audio bytes", bytes.len());

        let buffer = if wav::looks_like_wav(&bytes) {
            wav::decode_wav(&bytes)?
        } else {
            wav::decode_pcm16(&bytes, self.fallback_sample_rate)
        };
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_the_five_reference_fields() {
        let request = SynthesisRequest {
            refer_wav_path: "audio/ref.wav",
            prompt_text: "reference words",
            prompt_language: "zh",
            text: "hello there",
            text_language: "en",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["refer_wav_path"], "audio/ref.wav");
        assert_eq!(json["prompt_text"], "reference words");
        assert_eq!(json["prompt_language"], "zh");
        assert_eq!(json["text"], "hello there");
        assert_eq!(json["text_language"], "en");
    }
}
