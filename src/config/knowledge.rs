use log::{ info, warn };
use serde::de::DeserializeOwned;
use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("knowledge JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatedEvent {
    pub date: String,
    pub event: String,
    pub category: String,
}

/// External knowledge folded into a vendor's system message: a FAQ table
/// and a table of dated events, each a JSON array on disk. Both files are
/// optional; a missing or unreadable one logs a warning and contributes an
/// empty table.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBase {
    pub faqs: Vec<FaqEntry>,
    pub events: Vec<DatedEvent>,
}

impl KnowledgeBase {
    pub fn load(faq_path: Option<&Path>, events_path: Option<&Path>) -> Self {
        Self {
            faqs: load_table(faq_path, "FAQ"),
            events: load_table(events_path, "event"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faqs.is_empty() && self.events.is_empty()
    }

    /// Builds the seeded system message: persona first, then Q/A pairs,
    /// then one line per dated event.
    pub fn system_message(&self, persona: &str) -> String {
        let mut text = String::from(persona);
        text.push_str("\n\n");

        for faq in &self.faqs {
            text.push_str(&format!("Q: {}\nA: {}\n\n", faq.question, faq.answer));
        }
        for event in &self.events {
            text.push_str(
                &format!("Date: {}  Event: {}  Category: {}\n", event.date, event.event, event.category)
            );
        }

        text
    }
}

fn load_table<T: DeserializeOwned>(path: Option<&Path>, label: &str) -> Vec<T> {
    let path = match path {
        Some(p) => p,
        None => return Vec::new(),
    };
    match read_json(path) {
        Ok(entries) => {
            info!("Loaded {} {} entries from {}", entries.len(), label, path.display());
            entries
        }
        Err(e) => {
            warn!("Could not load {} table from {}: {}", label, path.display(), e);
            Vec::new()
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, KnowledgeError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_folds_persona_faqs_and_events() {
        let kb = KnowledgeBase {
            faqs: vec![FaqEntry {
                question: "When does the library open?".to_string(),
                answer: "08:00 on weekdays.".to_string(),
            }],
            events: vec![DatedEvent {
                date: "2026-04-01".to_string(),
                event: "Spring fair".to_string(),
                category: "campus".to_string(),
            }],
        };
        let message = kb.system_message("You are the campus guide.");
        assert!(message.starts_with("You are the campus guide."));
        assert!(message.contains("Q: When does the library open?"));
        assert!(message.contains("A: 08:00 on weekdays."));
        assert!(message.contains("Date: 2026-04-01  Event: Spring fair  Category: campus"));
    }

    #[test]
    fn missing_files_yield_empty_tables() {
        let kb = KnowledgeBase::load(
            Some(Path::new("/definitely/not/here.json")),
            None
        );
        assert!(kb.is_empty());
    }

    #[test]
    fn tables_deserialize_from_json_arrays() {
        let faqs: Vec<FaqEntry> = serde_json
            ::from_str(r#"[{"question":"q","answer":"a"}]"#)
            .unwrap();
        assert_eq!(faqs[0].question, "q");
        let events: Vec<DatedEvent> = serde_json
            ::from_str(r#"[{"date":"d","event":"e","category":"c"}]"#)
            .unwrap();
        assert_eq!(events[0].category, "c");
    }
}
