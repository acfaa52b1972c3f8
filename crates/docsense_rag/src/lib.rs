//! Retrieval-augmented answering: embed, search, fit to a token budget, answer with citations.

pub mod budget;
pub mod chunk;
pub mod embeddings;
pub mod generate;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod pipeline;
pub mod retrieve;

pub use budget::{build_context_string, BudgetConfig, ContextBudget};
pub use chunk::{ChunkInput, RetrievedChunk};
pub use generate::{AnswerGenerator, Citation, GeneratedAnswer};
pub use pipeline::{Pipeline, QueryOutcome};
pub use retrieve::Retriever;
