// Embeddings module
// Turns skill lists into fixed-dimension vectors and caches them per job record

pub mod hash;
pub mod ollama;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info, warn};

use crate::config::{Config, EmbeddingBackend, EmbeddingConfig};
use crate::dataset::{Corpus, JobRecord};
use crate::{MatcherError, Result};

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

pub type EmbeddingVector = Vec<f32>;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
const DEFAULT_BATCH_SIZE: usize = 32;

/// A text embedding backend with a fixed output dimension.
///
/// Implementations must be deterministic: the same text yields the same vector
/// for the lifetime of the process.
pub trait Embedder: Send + Sync {
    /// Backend name used in logs ("hash", "ollama")
    fn name(&self) -> &'static str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Embed several texts at once. Backends with a batch API should override this.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

type EmbedderFactory = dyn Fn() -> Result<Arc<dyn Embedder>> + Send + Sync;

/// Lazily built, shared embedding backend plus the per-record cache logic.
///
/// The backend is constructed on first use and then reused for every request
/// served by this provider. Concurrent first calls construct it only once; a
/// failed construction leaves the provider uninitialized so a later call can
/// try again.
pub struct EmbeddingProvider {
    factory: Box<EmbedderFactory>,
    embedder: OnceLock<Arc<dyn Embedder>>,
    init_lock: Mutex<()>,
    batch_size: usize,
}

impl EmbeddingProvider {
    #[inline]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            embedder: OnceLock::new(),
            init_lock: Mutex::new(()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Provider whose backend is chosen by the `[embedding]` settings
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        let embedding = config.embedding.clone();
        let batch_size = embedding.batch_size as usize;
        Self::new(move || build_embedder(&embedding)).with_batch_size(batch_size)
    }

    /// Provider around an already constructed backend
    #[inline]
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        let provider = Self::new(|| {
            Err(MatcherError::EmbeddingUnavailable(
                "embedder was supplied at construction".to_string(),
            ))
        });
        let _ = provider.embedder.set(embedder);
        provider
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.embedder.get().is_some()
    }

    /// The backend, constructing it on first call
    #[inline]
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        if let Some(embedder) = self.embedder.get() {
            return Ok(Arc::clone(embedder));
        }

        let _guard = self.init_lock.lock().map_err(|_| {
            MatcherError::EmbeddingUnavailable("model initialization lock poisoned".to_string())
        })?;

        // Another caller may have finished initialization while we waited
        if let Some(embedder) = self.embedder.get() {
            return Ok(Arc::clone(embedder));
        }

        debug!("Initializing embedding model");
        let embedder = (self.factory)().map_err(|e| {
            warn!("Embedding model initialization failed: {}", e);
            match e {
                unavailable @ MatcherError::EmbeddingUnavailable(_) => unavailable,
                other => MatcherError::EmbeddingUnavailable(other.to_string()),
            }
        })?;

        info!(
            "Initialized {} embedding model ({} dimensions)",
            embedder.name(),
            embedder.dimension()
        );
        let _ = self.embedder.set(Arc::clone(&embedder));
        Ok(embedder)
    }

    #[inline]
    pub fn dimension(&self) -> Result<usize> {
        Ok(self.embedder()?.dimension())
    }

    /// Embed a single text
    #[inline]
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let embedder = self.embedder()?;
        let vector = embedder.embed(text)?;
        check_dimension(embedder.dimension(), &vector)?;
        Ok(vector)
    }

    /// Compute embeddings for every record that does not have one yet.
    ///
    /// Returns the number of records embedded by this call; a second call on
    /// the same corpus returns 0. Batches are attached as they complete, so an
    /// error part-way keeps the vectors already computed.
    #[inline]
    pub fn ensure_embedded(&self, corpus: &mut Corpus) -> Result<usize> {
        let missing = corpus.missing_embeddings();
        if missing.is_empty() {
            debug!("All {} job records already embedded", corpus.len());
            return Ok(0);
        }

        let embedder = self.embedder()?;
        debug!(
            "Embedding {} of {} job records with {}",
            missing.len(),
            corpus.len(),
            embedder.name()
        );

        let mut computed = 0;
        for batch in missing.chunks(self.batch_size) {
            let texts: Vec<String> = batch
                .iter()
                .map(|&id| {
                    corpus
                        .get(id)
                        .map(JobRecord::embedding_text)
                        .unwrap_or_default()
                })
                .collect();

            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(MatcherError::EmbeddingUnavailable(format!(
                    "{} returned {} vectors for {} inputs",
                    embedder.name(),
                    vectors.len(),
                    texts.len()
                )));
            }

            for (&id, vector) in batch.iter().zip(vectors) {
                check_dimension(embedder.dimension(), &vector)?;
                corpus.attach_embedding(id, vector)?;
                computed += 1;
            }
        }

        info!("Computed {} job embeddings", computed);
        Ok(computed)
    }
}

/// Construct the backend named by the settings
#[inline]
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(
            config.embedding_dimension as usize,
        ))),
        EmbeddingBackend::Ollama => {
            let client = OllamaEmbedder::new(config)
                .map_err(|e| MatcherError::EmbeddingUnavailable(format!("{:#}", e)))?;
            client
                .health_check()
                .map_err(|e| MatcherError::EmbeddingUnavailable(format!("{:#}", e)))?;
            Ok(Arc::new(client))
        }
    }
}

fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(MatcherError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
