use docsense_core::error::AppError;
use docsense_core::settings::Settings;
use serde::{Deserialize, Serialize};

use crate::budget::BudgetConfig;
use crate::chunk::{ChunkInput, RetrievedChunk};
use crate::embeddings::embedder_from_settings;
use crate::generate::{AnswerGenerator, GeneratedAnswer};
use crate::index::index_from_settings;
use crate::llm::backend_from_settings;
use crate::retrieve::Retriever;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryOutcome {
    pub answer: GeneratedAnswer,
    /// Everything the retriever returned, before budgeting.
    pub matches: Vec<RetrievedChunk>,
}

/// Long-lived collaborators wired together once and shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl Pipeline {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let embedder = embedder_from_settings(settings)?;
        let index = index_from_settings(settings)?;
        let backend = backend_from_settings(settings)?;

        let retriever = Retriever::new(embedder, index, settings.qdrant_collection.clone());
        let generator = AnswerGenerator::new(backend, BudgetConfig::from_settings(settings))?;
        Ok(Self::new(retriever, generator))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    /// Make sure the collection exists. Call once before serving.
    pub fn ensure_ready(&self) -> Result<(), AppError> {
        self.retriever.ensure_collection()
    }

    pub fn ingest(&self, document_id: &str, chunks: &[ChunkInput]) -> Result<usize, AppError> {
        self.retriever.upsert(document_id, chunks)
    }

    /// Retrieve, budget and answer. A failed generation leaves no partial result.
    pub fn ask(&self, question: &str, top_k: usize) -> Result<QueryOutcome, AppError> {
        let matches = self.retriever.query(question, top_k)?;
        let answer = self.generator.generate(question, &matches)?;
        Ok(QueryOutcome { answer, matches })
    }
}
