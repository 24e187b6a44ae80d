use super::*;
use crate::dataset::{RawTable, validate_and_normalize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Hash embedder that counts how many texts it has embedded
struct CountingEmbedder {
    inner: HashEmbedder,
    calls: Arc<AtomicUsize>,
}

impl Embedder for CountingEmbedder {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

/// Fails for any text containing `poison`
struct FailingEmbedder {
    inner: HashEmbedder,
    poison: &'static str,
}

impl Embedder for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.contains(self.poison) {
            Err(MatcherError::EmbeddingUnavailable(
                "inference failed".to_string(),
            ))
        } else {
            self.inner.embed(text)
        }
    }
}

/// Claims one dimension and returns another
struct LyingEmbedder;

impl Embedder for LyingEmbedder {
    fn name(&self) -> &'static str {
        "lying"
    }

    fn dimension(&self) -> usize {
        8
    }

    fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Ok(vec![1.0; 4])
    }
}

fn counting_provider() -> (EmbeddingProvider, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let embedder = CountingEmbedder {
        inner: HashEmbedder::new(64),
        calls: Arc::clone(&calls),
    };
    (EmbeddingProvider::with_embedder(Arc::new(embedder)), calls)
}

fn corpus(skills: &[&str]) -> Corpus {
    let table = RawTable::new(
        vec!["Title".to_string(), "Skills".to_string()],
        skills
            .iter()
            .enumerate()
            .map(|(i, s)| vec![format!("Job {}", i), s.to_string()])
            .collect(),
    );
    validate_and_normalize(&table).expect("valid test corpus")
}

#[test]
fn embed_is_deterministic() {
    let provider = EmbeddingProvider::with_embedder(Arc::new(HashEmbedder::new(128)));

    let first = provider.embed("Python, SQL").expect("embedding succeeds");
    let second = provider.embed("Python, SQL").expect("embedding succeeds");

    assert_eq!(first, second);
    assert_eq!(first.len(), 128);
}

#[test]
fn ensure_embedded_fills_every_record() {
    let (provider, calls) = counting_provider();
    let mut corpus = corpus(&["Python, SQL", "Java, Spring", ""]);

    let computed = provider
        .ensure_embedded(&mut corpus)
        .expect("embedding succeeds");

    assert_eq!(computed, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(corpus.embedded_count(), 3);
    assert_eq!(corpus.dimension(), Some(64));
    assert_eq!(
        corpus.records()[0].embedding(),
        Some(HashEmbedder::new(64).embed_text("Python, SQL").as_slice())
    );
}

#[test]
fn ensure_embedded_is_idempotent() {
    let (provider, calls) = counting_provider();
    let mut corpus = corpus(&["Python, SQL", "Java, Spring", "Python, Pandas"]);

    provider
        .ensure_embedded(&mut corpus)
        .expect("first pass succeeds");
    let after_first = corpus.clone();
    let calls_after_first = calls.load(Ordering::SeqCst);

    let computed = provider
        .ensure_embedded(&mut corpus)
        .expect("second pass succeeds");

    assert_eq!(computed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(corpus, after_first);
}

#[test]
fn ensure_embedded_only_computes_missing_records() {
    let (provider, calls) = counting_provider();
    let mut corpus = corpus(&["Python", "Go", "Rust"]);
    corpus
        .attach_embedding(1, vec![0.5; 64])
        .expect("pre-seeded vector");

    let computed = provider
        .ensure_embedded(&mut corpus)
        .expect("embedding succeeds");

    assert_eq!(computed, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(corpus.records()[1].embedding(), Some(&[0.5; 64][..]));
}

#[test]
fn batches_respect_batch_size() {
    let (provider, calls) = counting_provider();
    let provider = provider.with_batch_size(2);
    let mut corpus = corpus(&["a", "b", "c", "d", "e"]);

    let computed = provider
        .ensure_embedded(&mut corpus)
        .expect("embedding succeeds");

    assert_eq!(computed, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn failure_keeps_previously_computed_batches() {
    let provider = EmbeddingProvider::with_embedder(Arc::new(FailingEmbedder {
        inner: HashEmbedder::new(64),
        poison: "COBOL",
    }))
    .with_batch_size(1);
    let mut corpus = corpus(&["Python", "Go", "COBOL", "Rust"]);

    let result = provider.ensure_embedded(&mut corpus);

    assert!(matches!(result, Err(MatcherError::EmbeddingUnavailable(_))));
    assert!(corpus.records()[0].has_embedding());
    assert!(corpus.records()[1].has_embedding());
    assert!(!corpus.records()[2].has_embedding());
    assert!(!corpus.records()[3].has_embedding());
}

#[test]
fn backend_dimension_mismatch_is_detected() {
    let provider = EmbeddingProvider::with_embedder(Arc::new(LyingEmbedder));
    let mut corpus = corpus(&["Python"]);

    assert!(matches!(
        provider.embed("Python"),
        Err(MatcherError::DimensionMismatch {
            expected: 8,
            actual: 4
        })
    ));
    assert!(matches!(
        provider.ensure_embedded(&mut corpus),
        Err(MatcherError::DimensionMismatch { .. })
    ));
    assert!(!corpus.records()[0].has_embedding());
}

#[test]
fn backend_is_initialized_lazily_and_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let provider = EmbeddingProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(HashEmbedder::new(64)) as Arc<dyn Embedder>)
    });

    assert!(!provider.is_initialized());
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    provider.embed("Go").expect("embedding succeeds");
    provider.embed("Rust").expect("embedding succeeds");
    let mut corpus = corpus(&["Python"]);
    provider
        .ensure_embedded(&mut corpus)
        .expect("embedding succeeds");

    assert!(provider.is_initialized());
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_cold_start_builds_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let provider = Arc::new(EmbeddingProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(20));
        Ok(Arc::new(HashEmbedder::new(64)) as Arc<dyn Embedder>)
    }));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.embed(&format!("skill {}", i)))
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .expect("thread completes")
            .expect("embedding succeeds");
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_initialization_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let provider = EmbeddingProvider::new(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(MatcherError::Other(anyhow::anyhow!("model file missing")))
        } else {
            Ok(Arc::new(HashEmbedder::new(64)) as Arc<dyn Embedder>)
        }
    });
    let mut corpus = corpus(&["Python"]);

    let first = provider.ensure_embedded(&mut corpus);
    assert!(
        matches!(first, Err(MatcherError::EmbeddingUnavailable(ref reason)) if reason.contains("model file missing"))
    );
    assert!(!provider.is_initialized());
    assert_eq!(corpus.embedded_count(), 0);

    let computed = provider
        .ensure_embedded(&mut corpus)
        .expect("second attempt succeeds");
    assert_eq!(computed, 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn initialization_failure_leaves_cache_intact() {
    let (seed_provider, _) = counting_provider();
    let mut corpus = corpus(&["Python", "Go"]);
    seed_provider
        .ensure_embedded(&mut corpus)
        .expect("seeding succeeds");
    let cached = corpus.clone();

    let broken = EmbeddingProvider::new(|| {
        Err(MatcherError::EmbeddingUnavailable(
            "out of memory".to_string(),
        ))
    });

    assert!(matches!(
        broken.embed("Python"),
        Err(MatcherError::EmbeddingUnavailable(_))
    ));
    assert_eq!(
        broken
            .ensure_embedded(&mut corpus)
            .expect("nothing to compute"),
        0
    );
    assert_eq!(corpus, cached);
}

#[test]
fn provider_from_default_config_uses_hash_backend() {
    let provider = EmbeddingProvider::from_config(&Config::default());

    assert_eq!(provider.dimension().expect("hash backend builds"), 384);
    let embedder = provider.embedder().expect("hash backend builds");
    assert_eq!(embedder.name(), "hash");
}

#[test]
fn unreachable_ollama_is_unavailable() {
    let config = EmbeddingConfig {
        provider: EmbeddingBackend::Ollama,
        host: "127.0.0.1".to_string(),
        port: 9,
        ..EmbeddingConfig::default()
    };

    let result = build_embedder(&config);

    assert!(matches!(result, Err(MatcherError::EmbeddingUnavailable(_))));
}
