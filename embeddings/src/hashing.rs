//! Offline embeddings from feature hashing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::Embedding;
use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::similarity::normalize;

/// Weight of a word pair relative to a single word.
const BIGRAM_WEIGHT: f32 = 0.5;

/// Bag-of-words vectors via the hashing trick.
///
/// Each lowercased word, and each adjacent word pair at half weight, is
/// hashed to a signed bucket; the vector is then scaled to unit length.
/// Texts that share vocabulary score close under cosine similarity. There
/// is no semantics beyond that, so this backend suits tests, demos and
/// air-gapped use.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket = digest[..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        let index = (bucket % self.dimension as u64) as usize;
        let sign = if digest[8] & 0x80 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }

    fn vectorise(&self, text: &str) -> Embedding {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut vector = vec![0.0; self.dimension];
        for word in &words {
            self.add_feature(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        Ok(EmbeddingResponse {
            embedding: self.vectorise(&request.text),
            model: self.model().to_string(),
            tokens_used: None,
        })
    }
}
