/// The wrap applied to every outbound user message: the persona text, the
/// language the reply should come back in, then the actual question.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    pub persona: String,
    pub reply_language: String,
}

impl PromptTemplate {
    pub fn new(persona: impl Into<String>, reply_language: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            reply_language: reply_language.into(),
        }
    }

    pub fn wrap(&self, user_text: &str) -> String {
        format!(
            "Character persona: {} Reply language: {} Question: {}",
            self.persona,
            self.reply_language,
            user_text
        )
    }
}
