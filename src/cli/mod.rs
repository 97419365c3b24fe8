use clap::Parser;
use std::path::PathBuf;

use crate::tts::Language;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (qwen, spark, zhipu, deepseek)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "qwen")]
    pub chat_llm_type: String,

    /// Base URL for the chat provider API (adapter default used if unset)
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// API key for the chat provider; zhipu expects the compound '<id>.<secret>' form
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., qwen-turbo, glm-4-flash, deepseek-chat)
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    // --- Session Args ---
    /// How many messages the conversation history keeps before FIFO eviction
    #[arg(long, env = "HISTORY_KEEP_COUNT", default_value = "15")]
    pub history_keep_count: usize,

    /// Persona text wrapped around every outbound user message
    #[arg(long, env = "PERSONA", default_value = "")]
    pub persona: String,

    /// Language the model is asked to reply in
    #[arg(long, env = "REPLY_LANGUAGE", default_value = "English")]
    pub reply_language: String,

    /// System message seeded at session start (non-deepseek vendors)
    #[arg(long, env = "SYSTEM_SETTING", default_value = "")]
    pub system_setting: String,

    // --- Knowledge Args (deepseek system-message seeding) ---
    /// Path to a JSON array of {question, answer} FAQ entries
    #[arg(long, env = "FAQ_PATH")]
    pub faq_path: Option<PathBuf>,

    /// Path to a JSON array of {date, event, category} records
    #[arg(long, env = "EVENTS_PATH")]
    pub events_path: Option<PathBuf>,

    // --- TTS Args ---
    /// TTS adapter type (fastapi, gradio); empty disables speech output
    #[arg(long, env = "TTS_TYPE", default_value = "")]
    pub tts_type: String,

    /// TTS server endpoint
    #[arg(long, env = "TTS_BASE_URL", default_value = "http://127.0.0.1:9880")]
    pub tts_base_url: String,

    /// Reference WAV path relative to the TTS server root (fastapi adapter)
    #[arg(long, env = "TTS_REFER_WAV_PATH", default_value = "")]
    pub tts_refer_wav_path: String,

    /// Transcript of the reference audio
    #[arg(long, env = "TTS_REFERENCE_TEXT", default_value = "")]
    pub tts_reference_text: String,

    /// Local reference WAV uploaded with each job (gradio adapter, required)
    #[arg(long, env = "TTS_REFERENCE_WAV")]
    pub tts_reference_wav: Option<PathBuf>,

    /// Language of the reference audio (zh, en, ja, ...)
    #[arg(long, env = "TTS_REFERENCE_LANGUAGE", default_value = "zh")]
    pub tts_reference_language: Language,

    /// Language of the synthesized speech
    #[arg(long, env = "TTS_TARGET_LANGUAGE", default_value = "zh")]
    pub tts_target_language: Language,

    /// Sample rate assumed for headerless PCM responses
    #[arg(long, env = "TTS_SAMPLE_RATE", default_value = "32000")]
    pub tts_sample_rate: u32,

    /// Text splitting mode passed to the synthesis job
    #[arg(long, env = "TTS_SPLIT_MODE", default_value = "No slice")]
    pub tts_split_mode: String,

    /// Decoding parameter: top-k
    #[arg(long, env = "TTS_TOP_K", default_value = "5")]
    pub tts_top_k: u32,

    /// Decoding parameter: top-p
    #[arg(long, env = "TTS_TOP_P", default_value = "1.0")]
    pub tts_top_p: f32,

    /// Decoding parameter: temperature
    #[arg(long, env = "TTS_TEMPERATURE", default_value = "1.0")]
    pub tts_temperature: f32,

    /// Use the text-reference ("no reference audio transcript") job mode
    #[arg(long, env = "TTS_TEXT_REFERENCE_MODE", default_value = "false")]
    pub tts_text_reference_mode: bool,

    /// How many times an empty job descriptor is re-submitted before giving up
    #[arg(long, env = "TTS_MAX_SUBMIT_RETRIES", default_value = "5")]
    pub tts_max_submit_retries: u32,

    /// Directory synthesized replies are written to as WAV files
    #[arg(long, env = "SPEAK_OUTPUT_DIR", default_value = "voice-out")]
    pub speak_output_dir: PathBuf,
}
