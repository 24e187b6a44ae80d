// Matching module
// Ranks job records against a free-text list of skills

pub mod ranker;


use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dataset::{Corpus, join_skills, normalize_skills};
use crate::embeddings::{EmbeddingProvider, EmbeddingVector};
use crate::{MatcherError, Result};

pub use ranker::{MatchResult, MatchRow, cosine_similarity, rank};

pub const DEFAULT_TOP_K: usize = 5;

/// A user's skills, normalized the same way as a job record's
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    skills: Vec<String>,
}

impl Query {
    /// Normalize raw query text; fails when no skills remain
    #[inline]
    pub fn parse(raw: &str) -> Result<Self> {
        let skills = normalize_skills(raw);
        if skills.is_empty() {
            return Err(MatcherError::EmptyQuery);
        }
        Ok(Self { skills })
    }

    #[inline]
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    /// Text fed to the embedding model
    #[inline]
    pub fn embedding_text(&self) -> String {
        join_skills(&self.skills)
    }
}

/// Progress of a single match request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Received,
    Validated,
    Embedded,
    Ranked,
    Done,
    Failed,
}

impl fmt::Display for MatchStage {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Embedded => "embedded",
            Self::Ranked => "ranked",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Orchestrates query normalization, embedding and ranking
pub struct Matcher {
    provider: Arc<EmbeddingProvider>,
    top_k: usize,
}

impl Matcher {
    #[inline]
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self {
            provider,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(EmbeddingProvider::from_config(config)))
            .with_top_k(config.matching.top_k)
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Best matches using the configured number of results
    #[inline]
    pub fn find_top_matches<'a>(
        &self,
        raw_query: &str,
        corpus: &'a mut Corpus,
    ) -> Result<Vec<MatchResult<'a>>> {
        self.find_matches(raw_query, corpus, self.top_k)
    }

    /// Rank `corpus` against `raw_query` and return the best `k` jobs.
    ///
    /// Missing job embeddings are computed and cached on the corpus. If the
    /// request fails, embeddings computed before the failure stay cached and
    /// are reused by the next request.
    #[inline]
    pub fn find_matches<'a>(
        &self,
        raw_query: &str,
        corpus: &'a mut Corpus,
        k: usize,
    ) -> Result<Vec<MatchResult<'a>>> {
        let mut stage = MatchStage::Received;
        debug!("Match request {}", stage);

        let result = self.run_request(raw_query, corpus, k, &mut stage);
        if let Err(e) = &result {
            warn!(
                "Match request {} after reaching stage {}: {}",
                MatchStage::Failed,
                stage,
                e
            );
        }
        result
    }

    fn run_request<'a>(
        &self,
        raw_query: &str,
        corpus: &'a mut Corpus,
        k: usize,
        stage: &mut MatchStage,
    ) -> Result<Vec<MatchResult<'a>>> {
        if k == 0 {
            return Err(MatcherError::InvalidTopK(k));
        }
        let query = Query::parse(raw_query)?;
        advance(stage, MatchStage::Validated);

        let query_vector: EmbeddingVector = self.provider.embed(&query.embedding_text())?;
        let computed = self.provider.ensure_embedded(corpus)?;
        if computed > 0 {
            debug!("Cached {} new job embeddings", computed);
        }
        advance(stage, MatchStage::Embedded);

        let corpus: &'a Corpus = corpus;
        let results = rank(&query_vector, corpus, k)?;
        advance(stage, MatchStage::Ranked);

        info!(
            "Matched {} skills against {} job records, returning {}",
            query.skills().len(),
            corpus.len(),
            results.len()
        );
        advance(stage, MatchStage::Done);
        Ok(results)
    }
}

fn advance(stage: &mut MatchStage, next: MatchStage) {
    debug!("Match request {} -> {}", stage, next);
    *stage = next;
}
