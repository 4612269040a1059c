//! Cheap syntactic repetition checks.
//!
//! Text similarity is bag-of-words Jaccard over lower-cased whitespace
//! tokens. Image identity is the SHA-256 of the raw bytes.

use daypost_core::{DedupConfig, PostRecord};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// |A∩B| / |A∪B|, defined as 0.0 when both texts have no tokens.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Hex SHA-256 of `bytes`, used as a content address.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    window: usize,
    threshold: f64,
}

impl SimilarityEngine {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self { window, threshold }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.window, config.threshold)
    }

    /// True when `new_text` repeats one of the last `window` posts.
    ///
    /// Histories shorter than the window never count as repetitive.
    pub fn is_too_similar(&self, new_text: &str, history: &[PostRecord]) -> bool {
        self.is_too_similar_to(new_text, history.iter().map(|post| post.content.as_str()), history.len())
    }

    /// Same check over bare texts, oldest first.
    pub fn is_too_similar_texts(&self, new_text: &str, history: &[&str]) -> bool {
        self.is_too_similar_to(new_text, history.iter().copied(), history.len())
    }

    fn is_too_similar_to<'a>(
        &self,
        new_text: &str,
        history: impl Iterator<Item = &'a str>,
        len: usize,
    ) -> bool {
        if len < self.window {
            return false;
        }

        let new_tokens = tokenize(new_text);
        history.skip(len - self.window).any(|previous| {
            let previous_tokens = tokenize(previous);
            let union = new_tokens.union(&previous_tokens).count();
            if union == 0 {
                return false;
            }
            let similarity = new_tokens.intersection(&previous_tokens).count() as f64 / union as f64;
            if similarity > self.threshold {
                debug!("Content similarity {:.2} exceeds {:.2}", similarity, self.threshold);
                true
            } else {
                false
            }
        })
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}
