//! Feature-hashing embedder
//!
//! Deterministic dense vectors from hashed term frequencies. Not as
//! semantically rich as the ONNX model, but needs no model files, so it
//! serves tests and air-gapped installs.

use anyhow::Result;
use std::collections::HashMap;

use super::EmbeddingEngine;

/// Name recorded in `embedding_metadata` for hash-built indexes
pub const MODEL_NAME: &str = "hash-fnv1a";

/// FNV-1a bucket hashing embedder
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Hash a term into a bucket index using FNV-1a
    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dimension as u64) as usize
    }

    /// Lowercase alphanumeric terms of two or more characters
    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() >= 2)
            .map(str::to_lowercase)
            .collect()
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return vec;
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for tok in &tokens {
            *tf.entry(tok.as_str()).or_default() += 1.0;
        }

        let total = tokens.len() as f32;
        for (term, count) in tf {
            // Longer terms carry more signal than short function words
            let weight = 1.0 + (term.len() as f32).ln();
            vec[self.bucket(term)] += (count / total) * weight;
        }

        let norm = super::l2_norm(&vec);
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }

        vec
    }
}

impl EmbeddingEngine for HashEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_text_is_zero_vector() {
        let mut e = HashEmbedder::new(128);
        let v = e.embed("").unwrap();
        assert_eq!(v.len(), 128);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_normalized_and_deterministic() {
        let mut e = HashEmbedder::new(384);
        let a = e.embed("severe headache with light sensitivity").unwrap();
        let b = e.embed("severe headache with light sensitivity").unwrap();

        assert_eq!(a, b);
        assert_relative_eq!(crate::embeddings::l2_norm(&a), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_shared_terms_score_higher() {
        let mut e = HashEmbedder::new(384);
        let query = e.embed_query("I have a severe headache").unwrap();
        let headache = e.embed_passage("headache").unwrap();
        let rash = e.embed_passage("itchy rash").unwrap();

        assert!(cosine_similarity(&query, &headache) > cosine_similarity(&query, &rash));
    }

    #[test]
    fn test_case_insensitive() {
        let mut e = HashEmbedder::new(64);
        assert_eq!(e.embed("Sore Throat").unwrap(), e.embed("sore throat").unwrap());
    }

    #[test]
    fn test_query_and_passage_share_space() {
        let mut e = HashEmbedder::new(32);
        let passage = e.embed_passage("high fever at night").unwrap();
        assert_eq!(e.embed_query("high fever at night").unwrap(), passage);
    }
}
