use std::time::Duration;

use docsense_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, GenerationRequest};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
    model: String,
}

impl OllamaBackend {
    pub fn new(client: OllamaClient, model: String) -> Self {
        Self { client, model }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn generate(&self, req: &GenerationRequest) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let body = GenerateRequest {
            model: &self.model,
            system: &req.system_prompt,
            prompt: &req.user_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: req.temperature,
                num_predict: req.max_response_tokens,
            },
        };

        let resp = ureq::post(&url)
            .timeout(Duration::from_secs(60))
            .send_json(serde_json::to_value(body).map_err(|e| {
                AppError::generation("RAG_GENERATION_FAILED", "Failed to encode generate request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: GenerateResponse = r.into_json().map_err(|e| {
                    AppError::generation("RAG_GENERATION_FAILED", "Failed to decode generate response")
                        .with_details(e.to_string())
                })?;
                if v.response.trim().is_empty() {
                    return Err(AppError::generation(
                        "RAG_GENERATION_FAILED",
                        "Generate response was empty",
                    ));
                }
                Ok(v.response)
            }
            Ok(r) => Err(
                AppError::generation("RAG_GENERATION_FAILED", "Generate request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::generation("RAG_GENERATION_FAILED", "Generate request failed")
                    .with_details(format!("status={status}"))
                    .with_retryable(status >= 500),
            ),
            Err(e) => Err(
                AppError::generation("RAG_GENERATION_FAILED", "Failed to call generate endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
