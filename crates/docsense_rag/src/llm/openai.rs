use std::time::Duration;

use docsense_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, GenerationRequest};

/// Chat-completions backend for OpenAI and API-compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, base_url: &str, model: String) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::configuration(
                "CONFIG_MISSING_API_KEY",
                "OpenAI API key must not be empty",
            ));
        }
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::configuration(
                "CONFIG_OPENAI_URL_INVALID",
                "OpenAI base URL must start with http:// or https://",
            )
            .with_details(format!("openai_base_url={base_url}")));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .build();
        Ok(Self {
            agent,
            api_key,
            base_url,
            model,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn generate(&self, req: &GenerationRequest) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &req.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user_prompt,
                },
            ],
            max_tokens: req.max_response_tokens,
            temperature: req.temperature,
        };

        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body);

        match resp {
            Ok(r) => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::generation("RAG_GENERATION_FAILED", "Failed to decode completion response")
                        .with_details(e.to_string())
                })?;
                let first = v.choices.into_iter().next().ok_or_else(|| {
                    AppError::generation("RAG_GENERATION_FAILED", "Completion response had no choices")
                })?;
                Ok(first.message.content.unwrap_or_default())
            }
            Err(ureq::Error::Status(status, r)) => {
                let body = r.into_string().unwrap_or_default();
                let code = match status {
                    401 | 403 => "RAG_GENERATION_UNAUTHORIZED",
                    429 => "RAG_GENERATION_RATE_LIMITED",
                    _ => "RAG_GENERATION_FAILED",
                };
                Err(AppError::generation(code, "Completion request failed")
                    .with_details(format!("status={status}; body={body}"))
                    .with_retryable(status == 429 || status >= 500))
            }
            Err(e) => Err(
                AppError::generation("RAG_GENERATION_FAILED", "Failed to call completion endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
