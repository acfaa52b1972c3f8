use docsense_core::error::AppError;

use super::{GenerationBackend, GenerationRequest};

const SNIPPET_CHARS: usize = 240;
const FIRST_CHUNK: &str = "[Chunk 1]\n";
const BLOCK_ENDS: [&str; 2] = ["\n\n[Chunk 2]\n", "\n\nQuestion: "];

pub const NO_CHUNKS_ANSWER: &str = "No relevant chunks found (placeholder).";

/// Offline backend that echoes the best-ranked context block. Needs no model or key.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderBackend;

impl PlaceholderBackend {
    pub fn new() -> Self {
        Self
    }
}

fn top_block(prompt: &str) -> Option<&str> {
    let start = prompt.find(FIRST_CHUNK)? + FIRST_CHUNK.len();
    let rest = &prompt[start..];
    let end = BLOCK_ENDS
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

impl GenerationBackend for PlaceholderBackend {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn generate(&self, req: &GenerationRequest) -> Result<String, AppError> {
        let Some(top) = top_block(&req.user_prompt).filter(|t| !t.is_empty()) else {
            return Ok(NO_CHUNKS_ANSWER.to_string());
        };
        Ok(format!(
            "Placeholder answer. Top match snippet:\n- text={}",
            snippet(top)
        ))
    }
}
