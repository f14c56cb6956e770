//! Placeholder generator for setups without a usable backend.
//!
//! Used when the configured backend cannot be initialised (for example a
//! missing API key). Every call fails with the reason, so the problem is
//! reported when a question is asked instead of at startup.

use crate::{application::services::AnswerGenerator, domain::DomainError};

pub struct NoOpGenerator {
    reason: String,
}

impl NoOpGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AnswerGenerator for NoOpGenerator {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, DomainError> {
        Err(DomainError::generation(format!(
            "no answer generator available: {}",
            self.reason
        )))
    }
}
