use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error category. Callers branch on this; `code` stays the stable, fine-grained identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input rejected at the service boundary.
    Validation,
    /// Embedding or similarity-index failure.
    Retrieval,
    /// Generation backend call failed.
    GenerationBackend,
    /// Missing or invalid settings, credentials or backend selection.
    Configuration,
    /// Local storage (SQLite) failure.
    Storage,
    /// The service itself failed, e.g. a worker task panicked.
    Internal,
}

/// Single structured error shape used across backend layers and exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, code, message)
    }

    pub fn retrieval(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Retrieval, code, message)
    }

    pub fn generation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GenerationBackend, code, message)
    }

    pub fn configuration(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, code, message)
    }

    pub fn storage(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, code, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Re-tag an error under a different kind, keeping code and details.
    pub fn into_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
