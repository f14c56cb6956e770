use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{application::services::AnswerGenerator, domain::DomainError};

/// Answer generator for any OpenAI-compatible `/chat/completions` endpoint.
///
/// The call is made once with no retry; quota, transport and malformed
/// responses all surface as [`DomainError::Generation`].
pub struct OpenAiCompatibleGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleGenerator {
    pub fn try_new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(DomainError::validation("generator base url cannot be empty"));
        }
        let model = model.into().trim().to_string();
        if model.is_empty() {
            return Err(DomainError::validation("generator model cannot be empty"));
        }

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Ok(Self {
            base_url,
            model,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            agent,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl AnswerGenerator for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, DomainError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let mut request = self.agent.post(&self.completions_url());
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        let response = request.send_json(&body).map_err(describe_error)?;
        let payload: ChatResponse = response
            .into_json()
            .map_err(|err| DomainError::generation(format!("malformed completion: {err}")))?;

        extract_answer(payload)
    }
}

fn extract_answer(payload: ChatResponse) -> Result<String, DomainError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| DomainError::generation("completion returned no content"))
}

fn describe_error(error: ureq::Error) -> DomainError {
    match error {
        ureq::Error::Status(code, response) => {
            let detail = response.into_string().unwrap_or_default();
            DomainError::generation(format!("HTTP {code}: {}", detail.trim()))
        }
        ureq::Error::Transport(transport) => {
            DomainError::generation(format!("transport error: {transport}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChatResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn answer_is_first_choice_content() {
        let payload = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Budget.txt says $5000. "}},
                          {"message":{"role":"assistant","content":"ignored"}}]}"#,
        );
        assert_eq!(extract_answer(payload).unwrap(), "Budget.txt says $5000.");
    }

    #[test]
    fn missing_content_is_a_generation_failure() {
        for raw in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(matches!(
                extract_answer(parse(raw)),
                Err(DomainError::Generation(_))
            ));
        }
    }

    #[test]
    fn request_body_matches_chat_schema() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 1000,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 1000
            })
        );
    }

    #[test]
    fn constructor_normalizes_url_and_rejects_blank_model() {
        let generator = OpenAiCompatibleGenerator::try_new(
            "https://api.example.com/v1/",
            "m",
            Some(" ".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            generator.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
        assert!(generator.api_key.is_none());

        assert!(OpenAiCompatibleGenerator::try_new("http://x", " ", None, Duration::from_secs(5))
            .is_err());
    }
}
