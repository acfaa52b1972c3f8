//! Process settings read from environment variables.
//!
//! Every field has a default so a bare `docsense` starts against a local
//! Qdrant with the placeholder embedder. Values are read once at startup and
//! passed down explicitly; nothing in the workspace reads the environment
//! after that.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RagEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    Qdrant,
    Sqlite,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Placeholder,
    Ollama,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
    /// Offline echo of the top context chunk.
    Placeholder,
}

fn unsupported(setting: &str, value: &str) -> AppError {
    AppError::configuration("CONFIG_UNSUPPORTED_VALUE", format!("Unsupported {setting}"))
        .with_details(format!("{setting}={value}"))
}

impl FromStr for RagEnv {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(unsupported("RAG_ENV", s)),
        }
    }
}

impl FromStr for IndexBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(unsupported("INDEX_BACKEND", s)),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "ollama" => Ok(Self::Ollama),
            _ => Err(unsupported("EMBEDDING_PROVIDER", s)),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "placeholder" => Ok(Self::Placeholder),
            _ => Err(unsupported("LLM_PROVIDER", s)),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Ollama => f.write_str("ollama"),
            Self::Placeholder => f.write_str("placeholder"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub rag_env: RagEnv,
    pub rag_port: u16,

    pub index_backend: IndexBackend,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub qdrant_vector_size: usize,
    pub sqlite_path: String,

    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub ollama_url: String,

    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ollama_model: String,

    pub max_context_tokens: i64,
    /// `None` means no count cap; configured as `MAX_CHUNKS=0`.
    pub max_chunks: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rag_env: RagEnv::Development,
            rag_port: 8000,
            index_backend: IndexBackend::Qdrant,
            qdrant_url: "http://qdrant:6333".to_string(),
            qdrant_api_key: None,
            qdrant_collection: "docsense_chunks".to_string(),
            qdrant_vector_size: 384,
            sqlite_path: "docsense_index.sqlite".to_string(),
            embedding_provider: EmbeddingProvider::Placeholder,
            embedding_model: "all-minilm".to_string(),
            ollama_url: "http://127.0.0.1:11434".to_string(),
            llm_provider: LlmProvider::OpenAi,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            ollama_model: "llama3.1".to_string(),
            max_context_tokens: 4000,
            max_chunks: Some(10),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse::<T>().map_err(|_| {
        AppError::configuration("CONFIG_INVALID_VALUE", "Setting must be a number")
            .with_details(format!("{key}={raw}"))
    })
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut s = Settings::default();

        if let Some(v) = get("RAG_ENV") {
            s.rag_env = v.parse()?;
        }
        if let Some(v) = get("RAG_PORT") {
            s.rag_port = parse_number("RAG_PORT", &v)?;
        }
        if let Some(v) = get("INDEX_BACKEND") {
            s.index_backend = v.parse()?;
        }
        if let Some(v) = get("QDRANT_URL") {
            s.qdrant_url = v;
        }
        s.qdrant_api_key = get("QDRANT_API_KEY");
        if let Some(v) = get("QDRANT_COLLECTION") {
            s.qdrant_collection = v;
        }
        if let Some(v) = get("QDRANT_VECTOR_SIZE") {
            s.qdrant_vector_size = parse_number("QDRANT_VECTOR_SIZE", &v)?;
        }
        if let Some(v) = get("SQLITE_INDEX_PATH") {
            s.sqlite_path = v;
        }
        if let Some(v) = get("EMBEDDING_PROVIDER") {
            s.embedding_provider = v.parse()?;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            s.embedding_model = v;
        }
        if let Some(v) = get("OLLAMA_URL") {
            s.ollama_url = v;
        }
        if let Some(v) = get("LLM_PROVIDER") {
            s.llm_provider = v.parse()?;
        }
        s.openai_api_key = get("OPENAI_API_KEY");
        if let Some(v) = get("OPENAI_BASE_URL") {
            s.openai_base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            s.openai_model = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            s.ollama_model = v;
        }
        if let Some(v) = get("MAX_CONTEXT_TOKENS") {
            let n: i64 = parse_number("MAX_CONTEXT_TOKENS", &v)?;
            if n < 0 {
                return Err(AppError::configuration(
                    "CONFIG_INVALID_VALUE",
                    "Setting must not be negative",
                )
                .with_details(format!("MAX_CONTEXT_TOKENS={v}")));
            }
            s.max_context_tokens = n;
        }
        if let Some(v) = get("MAX_CHUNKS") {
            let n: usize = parse_number("MAX_CHUNKS", &v)?;
            s.max_chunks = if n == 0 { None } else { Some(n) };
        }

        Ok(s)
    }

    pub fn is_production(&self) -> bool {
        self.rag_env == RagEnv::Production
    }
}
