pub mod audio;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod tts;

use chrono::Local;
use cli::Args;
use config::knowledge::KnowledgeBase;
use config::prompt::PromptTemplate;
use llm::chat::{ new_client as new_chat_client, ChatSession };
use llm::{ LlmConfig, LlmType };
use log::{ error, info, warn };
use std::error::Error;
use std::fs;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tts::{ new_client as new_tts_client, TtsBackend };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("History Keep Count: {}", args.history_keep_count);
    info!("Reply Language: {}", args.reply_language);
    info!("TTS Type: {}", if args.tts_type.is_empty() { "disabled" } else { &args.tts_type });
    if !args.tts_type.is_empty() {
        info!("TTS Base URL: {}", args.tts_base_url);
        info!("Speak Output Dir: {}", args.speak_output_dir.display());
    }
    info!("-------------------------");

    let llm_type: LlmType = args.chat_llm_type.parse()?;
    let llm_config = LlmConfig {
        llm_type,
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
        model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };
    let backend = new_chat_client(&llm_config)?;

    let template = PromptTemplate::new(args.persona.clone(), args.reply_language.clone());
    let mut session = ChatSession::new(backend, template, args.history_keep_count);

    // DeepSeek sessions start from a knowledge-seeded system message; the
    // other vendors take the plain system setting.
    let system_message = if llm_type == LlmType::DeepSeek {
        let knowledge = KnowledgeBase::load(
            args.faq_path.as_deref(),
            args.events_path.as_deref()
        );
        knowledge.system_message(&args.persona)
    } else {
        args.system_setting.clone()
    };
    if !system_message.trim().is_empty() {
        session.seed_system(system_message);
    }

    let tts_client: Option<Arc<dyn TtsBackend>> = if args.tts_type.is_empty() {
        None
    } else {
        Some(new_tts_client(&args)?)
    };
    if tts_client.is_some() {
        fs::create_dir_all(&args.speak_output_dir)?;
    }

    info!("Session ready. Type a message, or 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        let reply = match session.post_message(text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("chat failed: {}", e);
                continue;
            }
        };
        println!("{}", reply);

        if let Some(tts) = &tts_client {
            match tts.speak(&reply).await {
                Ok(buffer) => {
                    let bytes = audio::wav::encode_wav(
                        &buffer.samples,
                        buffer.sample_rate,
                        buffer.channels
                    );
                    let name = format!("reply-{}.wav", Local::now().format("%Y%m%d-%H%M%S"));
                    let path = args.speak_output_dir.join(name);
                    fs::write(&path, bytes)?;
                    info!(
                        "spoke {:.2}s of audio to {}",
                        buffer.duration_secs(),
                        path.display()
                    );
                }
                Err(e) => {
                    warn!("speech synthesis failed, keeping the text reply: {}", e);
                }
            }
        }
    }

    Ok(())
}
