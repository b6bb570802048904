//! Embedding service trait and the deterministic hash embedder.

use std::future::Future;
use std::pin::Pin;

use sha2::{Digest, Sha256};

use helpdesk_core::error::HelpdeskError;

/// Service for generating text embeddings.
///
/// Used for both indexing document chunks and embedding questions, so one
/// index must always be served by the same implementation.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, HelpdeskError>> + Send;

    /// Dimensionality of the produced vectors, when known up front.
    fn dimensions(&self) -> Option<usize>;

    /// Name of the model producing the vectors. Vectors from different
    /// models are not comparable.
    fn model_name(&self) -> String;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future` and so is not object-safe.
/// Every `EmbeddingService` gets this trait through the blanket impl below.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, HelpdeskError>> + Send + 'a>>;

    fn dimensions(&self) -> Option<usize>;

    fn model_name(&self) -> String;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, HelpdeskError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> Option<usize> {
        EmbeddingService::dimensions(self)
    }

    fn model_name(&self) -> String {
        EmbeddingService::model_name(self)
    }
}

/// Deterministic hash-based embeddings.
///
/// Identical text always maps to the identical unit vector; different text
/// maps to near-orthogonal vectors. Good enough for tests and for running
/// without an embedding provider, useless for semantic ranking.
///
/// Components are derived from SHA-256, so vectors persisted in an index
/// stay valid across builds.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let base = Sha256::new_with_prefix(text.as_bytes());
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let digest = base.clone().chain_update((i as u64).to_le_bytes()).finalize();
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[..8]);
            let h = u64::from_le_bytes(word);
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HelpdeskError> {
        if text.trim().is_empty() {
            return Err(HelpdeskError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn model_name(&self) -> String {
        "hash-sha256".to_string()
    }
}
