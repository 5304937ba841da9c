// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local sentence embeddings with ONNX Runtime.
//!
//! Runs a MiniLM-family sentence-transformer on CPU: tokenize, run the
//! encoder, mean-pool over the attention mask, L2-normalize.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use saga_core::SagaError;
use saga_core::traits::{EmbeddingAdapter, PluginAdapter};
use saga_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tracing::debug;

/// Longest token sequence fed to the encoder. Longer inputs are truncated.
const MAX_SEQUENCE_LEN: usize = 256;

/// Embedding adapter backed by an ONNX sentence-transformer.
pub struct OnnxEmbedder {
    /// The session needs `&mut` to run, hence the mutex.
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
}

// Safety: the session is only touched while holding the mutex, and
// tokenizer encoding takes `&self` without interior mutation.
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}

impl OnnxEmbedder {
    /// Loads `model_path` and the `tokenizer.json` next to it.
    ///
    /// `dimensions` is the expected output width; a model producing a
    /// different width is rejected at embed time.
    pub fn new(model_path: &Path, dimensions: usize) -> Result<Self, SagaError> {
        let model_dir = model_path
            .parent()
            .ok_or_else(|| SagaError::Embedding("model path has no parent directory".into()))?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            SagaError::Embedding(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let session = Session::builder()
            .map_err(|e| SagaError::Embedding(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| SagaError::Embedding(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| SagaError::Embedding(format!("failed to set thread count: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                SagaError::Embedding(format!(
                    "failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        debug!(model = %model_path.display(), dimensions, "embedding model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    /// Embeds one text into a unit-length vector.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, SagaError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SagaError::Embedding(format!("tokenization failed: {e}")))?;

        let seq_len = encoding.get_ids().len().min(MAX_SEQUENCE_LEN);
        let to_i64 = |values: &[u32]| -> Vec<i64> {
            values.iter().take(seq_len).map(|&v| i64::from(v)).collect()
        };
        let input_ids = to_i64(encoding.get_ids());
        let attention_mask = to_i64(encoding.get_attention_mask());
        let token_type_ids = to_i64(encoding.get_type_ids());

        let shape_err = |e: ndarray::ShapeError| SagaError::Embedding(format!("bad input shape: {e}"));
        let input_ids = Array2::from_shape_vec((1, seq_len), input_ids).map_err(shape_err)?;
        let mask = Array2::from_shape_vec((1, seq_len), attention_mask.clone()).map_err(shape_err)?;
        let type_ids = Array2::from_shape_vec((1, seq_len), token_type_ids).map_err(shape_err)?;

        let input_ids = TensorRef::from_array_view(&input_ids)
            .map_err(|e| SagaError::Embedding(format!("failed to build input_ids tensor: {e}")))?;
        let mask = TensorRef::from_array_view(&mask)
            .map_err(|e| SagaError::Embedding(format!("failed to build attention_mask tensor: {e}")))?;
        let type_ids = TensorRef::from_array_view(&type_ids)
            .map_err(|e| SagaError::Embedding(format!("failed to build token_type_ids tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| SagaError::Embedding(format!("embedding session poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask,
                "token_type_ids" => type_ids
            ])
            .map_err(|e| SagaError::Embedding(format!("inference failed: {e}")))?;

        // Last hidden state: [1, seq_len, hidden].
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SagaError::Embedding(format!("failed to read output tensor: {e}")))?;

        let hidden_size = shape.last().copied().unwrap_or_default() as usize;
        if hidden_size != self.dimensions {
            return Err(SagaError::Embedding(format!(
                "model produces {hidden_size}-dimensional vectors, configured for {}",
                self.dimensions
            )));
        }

        let pooled = mean_pool_with_attention(data, &attention_mask, seq_len, hidden_size);
        Ok(l2_normalize(&pooled))
    }
}

/// Averages token vectors whose attention mask is set.
fn mean_pool_with_attention(
    embeddings: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0usize;

    for (token, row) in embeddings.chunks_exact(hidden_size).take(seq_len).enumerate() {
        if attention_mask.get(token).copied().unwrap_or(0) > 0 {
            for (acc, v) in sum.iter_mut().zip(row) {
                *acc += v;
            }
            count += 1;
        }
    }

    if count > 0 {
        let n = count as f32;
        sum.iter_mut().for_each(|v| *v /= n);
    }
    sum
}

fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        match self.session.lock() {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("session poisoned: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, SagaError> {
        let embeddings = input
            .texts
            .iter()
            .map(|text| self.embed_text(text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}
