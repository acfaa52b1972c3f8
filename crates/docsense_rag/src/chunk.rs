use serde::{Deserialize, Serialize};

/// A search hit shaped for the rest of the pipeline.
///
/// Payload fields are copied verbatim from the index; anything the index did
/// not store stays `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub score: f32,
    pub document_id: Option<String>,
    pub chunk_index: Option<u32>,
    pub text: Option<String>,
}

impl RetrievedChunk {
    /// Text that can go into a prompt. Absent and empty text both yield `None`.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Same identity and score, different text.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            text: Some(text),
            ..self.clone()
        }
    }
}

/// One chunk of a document as handed to `Retriever::upsert`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkInput {
    pub chunk_id: String,
    pub chunk_index: u32,
    pub text: String,
}
