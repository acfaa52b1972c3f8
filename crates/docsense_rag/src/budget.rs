//! Token-budgeted context selection.
//!
//! Retrieved chunks are ranked by score and packed greedily into the tokens
//! left over after the prompt and response reserves. Token counts are
//! estimated from character counts through [`TokenEstimator`]; swapping in a
//! real tokenizer changes which chunks get selected, so it has to be an
//! explicit choice at construction.

use std::cmp::Ordering;

use docsense_core::error::AppError;
use docsense_core::settings::Settings;
use serde::{Deserialize, Serialize};

use crate::chunk::RetrievedChunk;

/// Marker inserted where trimmed text was cut.
pub const ELLIPSIS: &str = "...";

/// Below this many characters a head/tail split is not worth it.
const MIN_SPLIT_CHARS: usize = 100;

/// Characters held back from the suffix to make room for the ellipsis.
const ELLIPSIS_RESERVE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    pub max_tokens: i64,
    pub reserved_for_prompt: i64,
    pub reserved_for_response: i64,
    pub average_chars_per_token: f64,
    pub max_chunks: Option<usize>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            reserved_for_prompt: 500,
            reserved_for_response: 1000,
            average_chars_per_token: 4.0,
            max_chunks: None,
        }
    }
}

impl BudgetConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_tokens: settings.max_context_tokens,
            max_chunks: settings.max_chunks,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.average_chars_per_token.is_finite() && self.average_chars_per_token > 0.0) {
            return Err(AppError::configuration(
                "CONFIG_BUDGET_INVALID",
                "average_chars_per_token must be a positive number",
            )
            .with_details(format!(
                "average_chars_per_token={}",
                self.average_chars_per_token
            )));
        }
        Ok(())
    }
}

pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> i64;

    /// Characters that fit in `tokens`, the inverse used when trimming.
    fn char_budget(&self, tokens: i64) -> usize;
}

/// `tokens = chars / ratio`, fractional tokens discarded.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: f64,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> i64 {
        (text.chars().count() as f64 / self.chars_per_token) as i64
    }

    fn char_budget(&self, tokens: i64) -> usize {
        (tokens as f64 * self.chars_per_token).max(0.0) as usize
    }
}

fn take_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn take_suffix(text: &str, n: usize, total: usize) -> &str {
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((cut, _)) => &text[cut..],
        None => "",
    }
}

/// NaN sorts after every real score.
fn rank_key(c: &RetrievedChunk) -> f32 {
    if c.score.is_nan() {
        f32::NEG_INFINITY
    } else {
        c.score
    }
}

pub struct ContextBudget {
    config: BudgetConfig,
    estimator: Box<dyn TokenEstimator>,
}

impl std::fmt::Debug for ContextBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBudget")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContextBudget {
    pub fn new(config: BudgetConfig) -> Self {
        let estimator = CharRatioEstimator::new(config.average_chars_per_token);
        Self::with_estimator(config, Box::new(estimator))
    }

    pub fn with_estimator(config: BudgetConfig, estimator: Box<dyn TokenEstimator>) -> Self {
        Self { config, estimator }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn estimate_tokens(&self, text: &str) -> i64 {
        self.estimator.estimate(text)
    }

    /// Tokens left for retrieved context after both reserves. May be negative.
    pub fn available_budget(&self) -> i64 {
        self.config
            .max_tokens
            .saturating_sub(self.config.reserved_for_prompt)
            .saturating_sub(self.config.reserved_for_response)
    }

    /// Pick chunks, best score first, until the budget runs out.
    ///
    /// The first chunk that does not fit ends the walk. If nothing was
    /// accepted before it, a trimmed copy of that chunk is accepted instead.
    /// Later (possibly smaller) chunks are never considered.
    pub fn select_chunks(
        &self,
        chunks: &[RetrievedChunk],
        max_chunks: Option<usize>,
    ) -> Vec<RetrievedChunk> {
        let available = self.available_budget();
        if available <= 0 {
            tracing::debug!(available, "no context budget left after reserves");
            return Vec::new();
        }

        // Vec::sort_by is stable: equal scores keep retrieval order.
        let mut ranked: Vec<&RetrievedChunk> = chunks.iter().collect();
        ranked.sort_by(|a, b| {
            rank_key(b)
                .partial_cmp(&rank_key(a))
                .unwrap_or(Ordering::Equal)
        });
        if let Some(cap) = max_chunks {
            ranked.truncate(cap);
        }

        let mut selected: Vec<RetrievedChunk> = Vec::new();
        let mut total: i64 = 0;

        for chunk in ranked {
            let Some(text) = chunk.usable_text() else {
                continue;
            };

            let cost = self.estimate_tokens(text);
            if total.saturating_add(cost) <= available {
                selected.push(chunk.clone());
                total += cost;
                continue;
            }

            if selected.is_empty() {
                let trimmed = self.trim_to_fit(text, available);
                if !trimmed.is_empty() {
                    tracing::debug!(
                        chunk_id = %chunk.id,
                        cost,
                        available,
                        "trimmed oversized top chunk"
                    );
                    selected.push(chunk.with_text(trimmed));
                }
            }
            break;
        }

        tracing::debug!(
            candidates = chunks.len(),
            selected = selected.len(),
            tokens = total,
            available,
            "selected context chunks"
        );
        selected
    }

    /// Shorten `text` to roughly `max_tokens`, keeping its head and tail.
    pub fn trim_to_fit(&self, text: &str, max_tokens: i64) -> String {
        let max_chars = self.estimator.char_budget(max_tokens);
        let len = text.chars().count();
        if len <= max_chars {
            return text.to_string();
        }

        if max_chars < MIN_SPLIT_CHARS {
            return format!("{}{}", take_prefix(text, max_chars), ELLIPSIS);
        }

        let prefix_chars = max_chars / 2;
        let suffix_chars = max_chars - prefix_chars - ELLIPSIS_RESERVE;
        format!(
            "{}{}{}",
            take_prefix(text, prefix_chars),
            ELLIPSIS,
            take_suffix(text, suffix_chars, len)
        )
    }
}

/// Render selected chunks as `[Chunk N]` blocks separated by blank lines.
///
/// This exact layout is embedded in the answer prompt; changing it changes
/// what the generation backend sees.
pub fn build_context_string(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            c.usable_text()
                .map(|text| format!("[Chunk {}]\n{}\n", i + 1, text))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
