use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{ info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::time::Duration;

use super::{ Language, TtsBackend, TtsError };
use crate::audio::wav;
use crate::audio::AudioBuffer;
use crate::cli::Args;

const SUBMIT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Two-phase synthesis: submit a job carrying the base64-encoded reference
/// clip, then fetch the server-side file the job descriptor names. The
/// reference clip is encoded once at construction; having one is a hard
/// precondition.
///
/// A job descriptor with an empty file name is re-submitted up to
/// `max_submit_retries` times. The service this fronts did this forever;
/// the bound here trades that faithfulness for liveness.
pub struct GradioTtsClient {
    http: HttpClient,
    base_url: String,
    reference_b64: String,
    reference_text: String,
    reference_language: Language,
    target_language: Language,
    split_mode: String,
    top_k: u32,
    top_p: f32,
    temperature: f32,
    text_reference_mode: bool,
    max_submit_retries: u32,
}

#[derive(Deserialize)]
struct JobResponse {
    #[serde(default)]
    data: Vec<GeneratedFile>,
}

#[derive(Deserialize)]
struct GeneratedFile {
    #[serde(default)]
    name: String,
}

impl GradioTtsClient {
    pub fn new(reference: &AudioBuffer, reference_text: String, args: &Args) -> Result<Self, TtsError> {
        if reference.samples.is_empty() || reference_text.is_empty() {
            return Err(TtsError::MissingReference);
        }

        let reference_wav = wav::encode_wav(
            &reference.samples,
            reference.sample_rate,
            reference.channels
        );
        let reference_b64 = STANDARD.encode(reference_wav);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: args.tts_base_url.trim_end_matches('/').to_string(),
            reference_b64,
            reference_text,
            reference_language: args.tts_reference_language,
            target_language: args.tts_target_language,
            split_mode: args.tts_split_mode.clone(),
            top_k: args.tts_top_k,
            top_p: args.tts_top_p,
            temperature: args.tts_temperature,
            text_reference_mode: args.tts_text_reference_mode,
            max_submit_retries: args.tts_max_submit_retries,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, TtsError> {
        let path = args.tts_reference_wav.as_ref().ok_or(TtsError::MissingReference)?;
        let bytes = fs::read(path)?;
        let reference = wav::decode_wav(&bytes)?;
        Self::new(&reference, args.tts_reference_text.clone(), args)
    }

    /// Phase 1: submit the synthesis job, returning the server-side file
    /// name from the descriptor.
    async fn submit_job(&self, text: &str) -> Result<String, TtsError> {
        // The job endpoint takes a positional, mixed-type data array.
        let body = json!({
            "data": [
                {
                    "name": "audio.wav",
                    "data": format!("data:audio/wav;base64,{}", self.reference_b64),
                },
                self.reference_text,
                self.reference_language.label(),
                text,
                self.target_language.label(),
                self.split_mode,
                self.top_k,
                self.top_p,
                self.temperature,
                self.text_reference_mode,
            ]
        });

        let resp = self.http.post(&self.base_url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TtsError::Status { status, body });
        }

        let job: JobResponse = resp.json().await?;
        Ok(job.data.into_iter().next().map(|f| f.name).unwrap_or_default())
    }

    /// Phase 2: fetch the generated file as audio bytes.
    async fn fetch_file(&self, name: &str) -> Result<AudioBuffer, TtsError> {
        let url = format!("{}/file={}", self.base_url, name);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TtsError::Status { status, body });
        }
        let bytes = resp.bytes().await?;
        Ok(wav::decode_wav(&bytes)?)
    }
}

#[async_trait]
impl TtsBackend for GradioTtsClient {
    async fn speak(&self, text: &str) -> Result<AudioBuffer, TtsError> {
        for attempt in 1..=self.max_submit_retries {
            let name = self.submit_job(text).await?;
            if name.is_empty() {
                warn!(
                    "tts job returned no file name (attempt {}/{})",
                    attempt,
                    self.max_submit_retries
                );
                tokio::time::sleep(SUBMIT_RETRY_DELAY).await;
                continue;
            }
            info!("tts job produced file {:?}", name);
            return self.fetch_file(&name).await;
        }
        Err(TtsError::ExhaustedRetries(self.max_submit_retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn empty_reference_is_a_hard_precondition() {
        let args = Args::parse_from(["avatar-agent"]);
        let silent = AudioBuffer { samples: Vec::new(), sample_rate: 32000, channels: 1 };
        assert!(matches!(
            GradioTtsClient::new(&silent, "words".to_string(), &args),
            Err(TtsError::MissingReference)
        ));

        let clip = AudioBuffer { samples: vec![0.1, 0.2], sample_rate: 32000, channels: 1 };
        assert!(matches!(
            GradioTtsClient::new(&clip, String::new(), &args),
            Err(TtsError::MissingReference)
        ));
    }

    #[test]
    fn reference_clip_is_encoded_once_at_construction() {
        let mut args = Args::parse_from(["avatar-agent"]);
        args.tts_base_url = "http://127.0.0.1:9872/".to_string();
        let clip = AudioBuffer { samples: vec![0.5, -0.5], sample_rate: 16000, channels: 1 };
        let client = GradioTtsClient::new(&clip, "words".to_string(), &args).unwrap();

        let decoded = STANDARD.decode(&client.reference_b64).unwrap();
        let round_tripped = wav::decode_wav(&decoded).unwrap();
        assert_eq!(round_tripped.samples.len(), 2);
        assert_eq!(round_tripped.sample_rate, 16000);
        // Trailing slash on the endpoint is normalized away.
        assert_eq!(client.base_url, "http://127.0.0.1:9872");
    }

    #[test]
    fn job_response_tolerates_sparse_descriptors() {
        let job: JobResponse = serde_json
            ::from_str(r#"{"data":[{"name":"out.wav","data":"","is_file":true}],"is_generating":false,"duration":1.2,"average_duration":1.0}"#)
            .unwrap();
        assert_eq!(job.data[0].name, "out.wav");

        let empty: JobResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.data.is_empty());
    }
}
