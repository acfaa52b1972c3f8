use std::sync::Arc;

use docsense_core::error::AppError;
use docsense_core::settings::{LlmProvider, Settings};
use serde::{Deserialize, Serialize};

use crate::ollama::OllamaClient;

pub mod ollama_llm;
pub mod openai;
pub mod placeholder;

pub use ollama_llm::OllamaBackend;
pub use openai::OpenAiBackend;
pub use placeholder::PlaceholderBackend;

/// One prompt for a generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_response_tokens: u32,
    pub temperature: f32,
}

pub trait GenerationBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn generate(&self, req: &GenerationRequest) -> Result<String, AppError>;
}

/// Build the configured backend. Called once at startup.
pub fn backend_from_settings(settings: &Settings) -> Result<Arc<dyn GenerationBackend>, AppError> {
    let backend: Arc<dyn GenerationBackend> = match settings.llm_provider {
        LlmProvider::OpenAi => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                AppError::configuration(
                    "CONFIG_MISSING_API_KEY",
                    "OPENAI_API_KEY is required when LLM_PROVIDER=openai",
                )
            })?;
            Arc::new(OpenAiBackend::new(
                api_key,
                &settings.openai_base_url,
                settings.openai_model.clone(),
            )?)
        }
        LlmProvider::Ollama => {
            let client = OllamaClient::new(&settings.ollama_url)?;
            Arc::new(OllamaBackend::new(client, settings.ollama_model.clone()))
        }
        LlmProvider::Placeholder => Arc::new(PlaceholderBackend::new()),
    };
    tracing::info!(backend = backend.name(), provider = %settings.llm_provider, "generation backend ready");
    Ok(backend)
}
