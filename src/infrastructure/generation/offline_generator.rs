use crate::{application::services::AnswerGenerator, domain::DomainError};

const DOCUMENT_PREFIX: &str = "Document: ";
const QUESTION_PREFIX: &str = "Question: ";

/// A deterministic generator that never leaves the machine.
///
/// It does not understand the documents; it restates the question and lists
/// the documents present in the context. Handy for demos and for exercising
/// the pipeline without an API key.
pub struct OfflineGenerator {
    label: String,
}

impl OfflineGenerator {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    fn compose(prompt: &str) -> String {
        let question = prompt
            .lines()
            .find_map(|line| line.strip_prefix(QUESTION_PREFIX))
            .map(str::trim)
            .unwrap_or_default();
        let documents: Vec<&str> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix(DOCUMENT_PREFIX))
            .map(str::trim)
            .collect();

        if documents.is_empty() {
            return format!(
                "The provided documents do not contain enough information to answer \"{question}\"."
            );
        }

        format!(
            "Offline mode cannot interpret \"{question}\". The context contained: {}.",
            documents.join(", ")
        )
    }
}

impl Default for OfflineGenerator {
    fn default() -> Self {
        Self::new("tanya/offline")
    }
}

impl AnswerGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::validation("prompt cannot be empty"));
        }
        // one whitespace-separated word per token is close enough offline
        let answer = Self::compose(prompt);
        let words: Vec<&str> = answer
            .split_whitespace()
            .take(max_tokens.max(1) as usize)
            .collect();
        Ok(words.join(" "))
    }
}
