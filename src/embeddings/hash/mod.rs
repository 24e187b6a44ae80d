
use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use super::{Embedder, EmbeddingVector};
use crate::Result;

// Changing either key changes every vector this backend produces
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

/// Deterministic embedding by feature hashing.
///
/// Each comma-separated skill contributes a whole-phrase feature and one feature
/// per word, so "Machine Learning" is close to both "Machine Learning" and
/// "Deep Learning". Features land in a bucket with a hashed sign and the result
/// is L2-normalized. Needs no model files or network access.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    #[inline]
    fn default() -> Self {
        Self::new(super::DEFAULT_EMBEDDING_DIMENSION as usize)
    }
}

impl HashEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Hash features extracted from `text`, in order of appearance
    #[inline]
    pub fn features(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut features = Vec::new();

        for phrase in lowered.split(',') {
            let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
            if phrase.is_empty() {
                continue;
            }

            features.push(format!("phrase:{}", phrase));
            features.extend(
                phrase
                    .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
                    .filter(|word| !word.is_empty())
                    .map(|word| format!("word:{}", word)),
            );
        }

        features
    }

    #[inline]
    pub fn embed_text(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0f32; self.dimension];

        for feature in Self::features(text) {
            let (index, sign) = self.bucket(&feature);
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        hasher.write(feature.as_bytes());
        let hash = hasher.finish();

        let index = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Embedder for HashEmbedder {
    #[inline]
    fn name(&self) -> &'static str {
        "hash"
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        Ok(self.embed_text(text))
    }
}
