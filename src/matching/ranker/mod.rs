
use tracing::{debug, error};

use crate::dataset::{Corpus, JobRecord, join_skills};
use crate::{MatcherError, Result};

/// A job record scored against a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub record: &'a JobRecord,
    pub score: f32,
}

/// Display form of a match: title, company, joined skills and a two-decimal score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub title: String,
    pub company: String,
    pub skills: String,
    pub score: String,
}

impl MatchResult<'_> {
    #[inline]
    pub fn formatted_score(&self) -> String {
        format!("{:.2}", self.score)
    }

    #[inline]
    pub fn to_row(&self) -> MatchRow {
        MatchRow {
            title: self.record.title.clone(),
            company: self.record.company.clone(),
            skills: join_skills(&self.record.skills),
            score: self.formatted_score(),
        }
    }
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero magnitude or a
/// non-finite component
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if !similarity.is_finite() {
        return 0.0;
    }

    similarity.clamp(-1.0, 1.0)
}

/// Score every record against `query` and keep the best `k`.
///
/// Records must already carry embeddings of the query's dimension. Equal
/// scores keep corpus order.
#[inline]
pub fn rank<'a>(query: &[f32], corpus: &'a Corpus, k: usize) -> Result<Vec<MatchResult<'a>>> {
    if k == 0 {
        return Err(MatcherError::InvalidTopK(k));
    }

    let mut results = Vec::with_capacity(corpus.len());
    for record in corpus {
        let Some(embedding) = record.embedding() else {
            error!("Job record {} has no embedding at ranking time", record.id);
            debug_assert!(false, "ranking requires embedded records");
            return Err(MatcherError::DimensionMismatch {
                expected: query.len(),
                actual: 0,
            });
        };

        if embedding.len() != query.len() {
            error!(
                "Job record {} has a {}-dimension embedding, query has {}",
                record.id,
                embedding.len(),
                query.len()
            );
            debug_assert!(false, "ranking requires matching dimensions");
            return Err(MatcherError::DimensionMismatch {
                expected: query.len(),
                actual: embedding.len(),
            });
        }

        results.push(MatchResult {
            record,
            score: cosine_similarity(query, embedding),
        });
    }

    // sort_by is stable, so ties stay in corpus order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);

    debug!(
        "Ranked {} job records, returning top {}",
        corpus.len(),
        results.len()
    );
    Ok(results)
}
