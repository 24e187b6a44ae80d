// Dataset module
// Turns an uploaded job table into a validated corpus of job records

pub mod loader;


use std::path::Path;

use tracing::{debug, info};

use crate::embeddings::EmbeddingVector;
use crate::{MatcherError, Result};

pub use loader::{DatasetFormat, RawTable, load_table};

pub const SKILLS_COLUMN: &str = "Skills";
pub const TITLE_COLUMN: &str = "Title";
pub const COMPANY_COLUMN: &str = "Company";
pub const CITY_COLUMN: &str = "City";
pub const REGION_COLUMN: &str = "Region";

const SKILL_DELIMITER: char = ',';

/// One job listing with its normalized skills
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Row index in the uploaded table
    pub id: usize,
    pub title: String,
    pub company: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub skills: Vec<String>,
    embedding: Option<EmbeddingVector>,
}

impl JobRecord {
    #[inline]
    pub fn new(id: usize, title: String, company: String, skills: Vec<String>) -> Self {
        Self {
            id,
            title,
            company,
            city: None,
            region: None,
            skills,
            embedding: None,
        }
    }

    #[inline]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Text fed to the embedding model for this record
    #[inline]
    pub fn embedding_text(&self) -> String {
        join_skills(&self.skills)
    }
}

/// The validated job records of one dataset.
///
/// Every attached embedding has the same dimension; the first vector attached
/// fixes it for the lifetime of the corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    records: Vec<JobRecord>,
    dimension: Option<usize>,
}

impl Corpus {
    /// Build a corpus from records, reassigning ids to their position
    #[inline]
    pub fn new(records: Vec<JobRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(id, record)| JobRecord {
                id,
                embedding: None,
                ..record
            })
            .collect();
        Self {
            records,
            dimension: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&JobRecord> {
        self.records.get(id)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, JobRecord> {
        self.records.iter()
    }

    /// Dimension shared by all attached embeddings, if any are attached
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn embedded_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_embedding()).count()
    }

    /// Ids of records that still need an embedding, in corpus order
    #[inline]
    pub fn missing_embeddings(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| !r.has_embedding())
            .map(|r| r.id)
            .collect()
    }

    /// Attach or replace the embedding of record `id`
    #[inline]
    pub fn attach_embedding(&mut self, id: usize, vector: EmbeddingVector) -> Result<()> {
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(MatcherError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let record = self.records.get_mut(id).ok_or_else(|| {
            MatcherError::Dataset(format!("No job record with id {} in corpus", id))
        })?;

        self.dimension.get_or_insert(vector.len());
        record.embedding = Some(vector);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a JobRecord;
    type IntoIter = std::slice::Iter<'a, JobRecord>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Split a comma-delimited skills field into trimmed, non-empty tokens.
///
/// Order and duplicates are kept as written; no case folding.
#[inline]
pub fn normalize_skills(raw: &str) -> Vec<String> {
    raw.split(SKILL_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[inline]
pub fn join_skills(skills: &[String]) -> String {
    skills.join(", ")
}

/// Check the schema of a raw table and build its corpus
#[inline]
pub fn validate_and_normalize(table: &RawTable) -> Result<Corpus> {
    let skills_column = table
        .column_index(SKILLS_COLUMN)
        .ok_or_else(|| MatcherError::MissingColumn(SKILLS_COLUMN.to_string()))?;

    if table.is_empty() {
        return Err(MatcherError::EmptyDataset);
    }

    let title_column = table.column_index(TITLE_COLUMN);
    let company_column = table.column_index(COMPANY_COLUMN);
    let city_column = table.column_index(CITY_COLUMN);
    let region_column = table.column_index(REGION_COLUMN);

    let text_at = |row: usize, column: Option<usize>| -> String {
        column
            .and_then(|c| table.cell(row, c))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };
    let optional_at = |row: usize, column: Option<usize>| -> Option<String> {
        Some(text_at(row, column)).filter(|value| !value.is_empty())
    };

    let records: Vec<JobRecord> = (0..table.row_count())
        .map(|row| JobRecord {
            id: row,
            title: text_at(row, title_column),
            company: text_at(row, company_column),
            city: optional_at(row, city_column),
            region: optional_at(row, region_column),
            skills: normalize_skills(table.cell(row, skills_column).unwrap_or_default()),
            embedding: None,
        })
        .collect();

    let without_skills = records.iter().filter(|r| r.skills.is_empty()).count();
    if without_skills > 0 {
        debug!("{} job records have no skills listed", without_skills);
    }

    info!("Validated dataset with {} job records", records.len());
    Ok(Corpus {
        records,
        dimension: None,
    })
}

/// Load and validate a dataset file in one step
#[inline]
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let table = load_table(path)?;
    validate_and_normalize(&table)
}
