use std::sync::Arc;

use docsense_core::error::{AppError, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::budget::{build_context_string, BudgetConfig, ContextBudget, ELLIPSIS};
use crate::chunk::RetrievedChunk;
use crate::llm::{GenerationBackend, GenerationRequest};

pub mod prompts;

/// Returned without calling the backend when there is nothing to ground an answer in.
pub const INSUFFICIENT_INFORMATION_ANSWER: &str =
    "I don't have sufficient information in my knowledge base to answer this question.";

/// Response ceiling passed to the backend on every call.
pub const MAX_RESPONSE_TOKENS: u32 = 1000;

pub const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub chunk_id: String,
    pub document_id: Option<String>,
    pub chunk_index: Option<u32>,
    pub text_snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl GeneratedAnswer {
    pub fn insufficient_information() -> Self {
        Self {
            answer: INSUFFICIENT_INFORMATION_ANSWER.to_string(),
            citations: Vec::new(),
        }
    }
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

impl Citation {
    pub fn for_chunk(chunk: &RetrievedChunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            document_id: chunk.document_id.clone(),
            chunk_index: chunk.chunk_index,
            text_snippet: snippet(chunk.text.as_deref().unwrap_or_default()),
        }
    }
}

/// Grounded answers with one citation per chunk that made it into the prompt.
#[derive(Clone)]
pub struct AnswerGenerator {
    backend: Arc<dyn GenerationBackend>,
    budget: Arc<ContextBudget>,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: BudgetConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self::with_budget(backend, ContextBudget::new(config)))
    }

    pub fn with_budget(backend: Arc<dyn GenerationBackend>, budget: ContextBudget) -> Self {
        Self {
            backend,
            budget: Arc::new(budget),
        }
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    pub fn generate(
        &self,
        question: &str,
        chunks: &[RetrievedChunk],
    ) -> Result<GeneratedAnswer, AppError> {
        if chunks.is_empty() {
            tracing::debug!("no retrieved chunks; skipping generation");
            return Ok(GeneratedAnswer::insufficient_information());
        }

        let selected = self
            .budget
            .select_chunks(chunks, self.budget.config().max_chunks);
        if selected.is_empty() {
            tracing::debug!(retrieved = chunks.len(), "no chunk fits the context budget");
            return Ok(GeneratedAnswer::insufficient_information());
        }

        let context = build_context_string(&selected);
        let req = GenerationRequest {
            system_prompt: prompts::system_prompt(),
            user_prompt: prompts::user_prompt(question, &context),
            max_response_tokens: MAX_RESPONSE_TOKENS,
            temperature: 0.0,
        };

        let answer = self.backend.generate(&req).map_err(|e| {
            tracing::warn!(backend = self.backend.name(), code = %e.code, "generation failed");
            e.into_kind(ErrorKind::GenerationBackend)
        })?;

        let citations = selected.iter().map(Citation::for_chunk).collect::<Vec<_>>();
        tracing::info!(
            backend = self.backend.name(),
            retrieved = chunks.len(),
            cited = citations.len(),
            "generated answer"
        );

        Ok(GeneratedAnswer { answer, citations })
    }
}
