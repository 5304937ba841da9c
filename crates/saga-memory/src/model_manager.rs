// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-run download of the embedding model.
//!
//! Files land in `<model_dir>/<model>/` and are reused afterwards.

use std::path::{Path, PathBuf};

use saga_config::model::EmbeddingConfig;
use saga_core::SagaError;
use tracing::info;

const HF_BASE: &str = "https://huggingface.co";

/// Resolves and fetches model files for one embedding model.
pub struct ModelManager {
    models_root: PathBuf,
    model: String,
}

impl ModelManager {
    pub fn new(models_root: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            models_root: models_root.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(&config.model_dir, &config.model)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.models_root.join(&self.model)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join("model.onnx")
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir().join("tokenizer.json")
    }

    pub fn is_model_available(&self) -> bool {
        self.model_path().exists() && self.tokenizer_path().exists()
    }

    /// Quantized ONNX export and tokenizer URLs on Hugging Face.
    fn sources(&self) -> [(&'static str, String); 2] {
        [
            (
                "model.onnx",
                format!(
                    "{HF_BASE}/onnx-community/{}-ONNX/resolve/main/onnx/model_quantized.onnx",
                    self.model
                ),
            ),
            (
                "tokenizer.json",
                format!(
                    "{HF_BASE}/sentence-transformers/{}/resolve/main/tokenizer.json",
                    self.model
                ),
            ),
        ]
    }

    /// Downloads any missing file and returns the model path.
    pub async fn ensure_model(&self) -> Result<PathBuf, SagaError> {
        if self.is_model_available() {
            return Ok(self.model_path());
        }

        let model_dir = self.model_dir();
        info!(model = self.model, dir = %model_dir.display(), "embedding model not cached, downloading");
        tokio::fs::create_dir_all(&model_dir)
            .await
            .map_err(|e| SagaError::Embedding(format!("failed to create {}: {e}", model_dir.display())))?;

        for (filename, url) in self.sources() {
            let dest = model_dir.join(filename);
            if dest.exists() {
                continue;
            }
            match download_file(&url, &dest).await {
                Ok(size) => info!(file = filename, bytes = size, "downloaded"),
                Err(e) => {
                    let _ = tokio::fs::remove_file(&dest).await;
                    return Err(e);
                }
            }
        }

        Ok(self.model_path())
    }
}

async fn download_file(url: &str, dest: &Path) -> Result<usize, SagaError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| SagaError::Embedding(format!("failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(SagaError::Embedding(format!(
            "download of {url} failed with status {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SagaError::Embedding(format!("failed to read {url}: {e}")))?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| SagaError::Embedding(format!("failed to write {}: {e}", dest.display())))?;

    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_nest_under_model_name() {
        let mgr = ModelManager::new("/var/lib/saga/models", "all-MiniLM-L6-v2");
        assert_eq!(
            mgr.model_path(),
            PathBuf::from("/var/lib/saga/models/all-MiniLM-L6-v2/model.onnx")
        );
        assert_eq!(
            mgr.tokenizer_path(),
            PathBuf::from("/var/lib/saga/models/all-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn download_urls_follow_model_name() {
        let mgr = ModelManager::new("/m", "all-MiniLM-L12-v2");
        let [(_, model_url), (_, tokenizer_url)] = mgr.sources();
        assert!(model_url.contains("onnx-community/all-MiniLM-L12-v2-ONNX"));
        assert!(tokenizer_url.contains("sentence-transformers/all-MiniLM-L12-v2"));
    }

    #[tokio::test]
    async fn cached_model_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path(), "tiny");
        std::fs::create_dir_all(mgr.model_dir()).unwrap();
        std::fs::write(mgr.model_path(), b"onnx").unwrap();
        std::fs::write(mgr.tokenizer_path(), b"{}").unwrap();

        assert!(mgr.is_model_available());
        assert_eq!(mgr.ensure_model().await.unwrap(), mgr.model_path());
    }
}
