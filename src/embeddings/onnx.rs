//! Sentence-transformer backend on ONNX Runtime
//!
//! A model directory holds `tokenizer.json` plus `model_quantized.onnx`
//! and/or `model.onnx`. Symptom text is tokenized, run through the graph,
//! mean-pooled over non-padding tokens and scaled to unit length, so cosine
//! scores against the stored index reduce to dot products.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use ort::{inputs, session::Session, value::Value};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

use super::{l2_norm, EmbeddingEngine};
use crate::paths;
use crate::project::EmbeddingsSection;

/// Positional limit shared by the MiniLM, BGE and E5 families
const MAX_TOKENS: usize = 512;

/// Graph and tokenizer locations for one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub graph: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Prefer the quantized graph when the directory has one
    pub fn locate(dir: &Path) -> Self {
        let quantized = paths::models::onnx_quantized(dir);
        Self {
            graph: if quantized.exists() {
                quantized
            } else {
                paths::models::onnx(dir)
            },
            tokenizer: paths::models::tokenizer(dir),
        }
    }

    fn ensure_present(&self) -> Result<()> {
        if !self.graph.exists() {
            bail!(
                "ONNX model not found at: {}\n\n\
                 Fetch all-MiniLM-L6-v2 with:\n  \
                 curl -L --create-dirs -o {} \\\n    \
                 https://huggingface.co/Xenova/all-MiniLM-L6-v2/resolve/main/onnx/model_quantized.onnx\n\n\
                 or set `backend = \"hash\"` under [embeddings] in .symptom-rag/config.toml",
                self.graph.display(),
                self.graph.display()
            );
        }
        if !self.tokenizer.exists() {
            bail!(
                "Tokenizer not found at: {}\n\n\
                 Fetch it with:\n  \
                 curl -L -o {} \\\n    \
                 https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
                self.tokenizer.display(),
                self.tokenizer.display()
            );
        }
        Ok(())
    }
}

/// Transformer embedder for symptom descriptions and user complaints
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    dimension: usize,
    model_name: String,
    query_prefix: String,
    passage_prefix: String,
}

impl OnnxEmbedder {
    /// Load the model named by `[embeddings]` from `model_dir`
    pub fn load(section: &EmbeddingsSection, model_dir: &Path) -> Result<Self> {
        let files = ModelFiles::locate(model_dir);
        files.ensure_present()?;

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&files.graph)
            .with_context(|| format!("Failed to load {}", files.graph.display()))?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        Ok(Self {
            session,
            tokenizer,
            dimension: section.dimension,
            model_name: section.model.clone(),
            query_prefix: section.query_prefix.clone().unwrap_or_default(),
            passage_prefix: section.passage_prefix.clone().unwrap_or_default(),
        })
    }

    /// Token ids and attention mask, special tokens included
    fn encode(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let ids = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let mask = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        Ok((ids, mask))
    }
}

fn single_row(values: Vec<i64>) -> Result<Array2<i64>> {
    Array2::from_shape_vec((1, values.len()), values).context("Failed to shape model input")
}

/// Average the token rows the mask keeps, then scale to unit length.
///
/// An all-padding input yields the zero vector.
fn pool(hidden: &[f32], mask: &[i64], width: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; width];
    for (token, _) in hidden
        .chunks_exact(width)
        .zip(mask)
        .filter(|(_, m)| **m != 0)
    {
        pooled.iter_mut().zip(token).for_each(|(acc, x)| *acc += x);
    }

    // Dividing by the token count first would not change the direction
    let norm = l2_norm(&pooled);
    if norm > 0.0 {
        pooled.iter_mut().for_each(|x| *x /= norm);
    }
    pooled
}

impl EmbeddingEngine for OnnxEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let (ids, mask) = self.encode(text)?;
        let token_types = vec![0i64; ids.len()];

        let outputs = self
            .session
            .run(inputs![
                "input_ids" => Value::from_array(single_row(ids)?)?,
                "attention_mask" => Value::from_array(single_row(mask.clone())?)?,
                "token_type_ids" => Value::from_array(single_row(token_types)?)?
            ])
            .context("ONNX inference failed")?;

        let (shape, hidden) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .context("Model has no last_hidden_state output")?;
        let dims = shape.as_ref();
        match dims {
            [1, _, width] if *width as usize == self.dimension => {}
            _ => bail!(
                "Model {} returned hidden state {:?}, expected [1, tokens, {}]",
                self.model_name,
                dims,
                self.dimension
            ),
        }

        Ok(pool(hidden, &mask, self.dimension))
    }

    fn embed_query(&mut self, text: &str) -> Result<Vec<f32>> {
        let input = format!("{}{}", self.query_prefix, text);
        self.embed(&input)
    }

    fn embed_passage(&mut self, text: &str) -> Result<Vec<f32>> {
        let input = format!("{}{}", self.passage_prefix, text);
        self.embed(&input)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
