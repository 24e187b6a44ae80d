use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::dataset::{Corpus, load_corpus};
use crate::matching::{MatchResult, MatchRow, Matcher};

/// Record and skill counts for a validated dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub records: usize,
    pub records_with_skills: usize,
    pub distinct_skills: usize,
    pub records_with_location: usize,
}

impl DatasetSummary {
    #[inline]
    pub fn of(corpus: &Corpus) -> Self {
        let distinct: BTreeSet<&str> = corpus
            .iter()
            .flat_map(|record| record.skills.iter().map(String::as_str))
            .collect();

        Self {
            records: corpus.len(),
            records_with_skills: corpus.iter().filter(|r| !r.skills.is_empty()).count(),
            distinct_skills: distinct.len(),
            records_with_location: corpus
                .iter()
                .filter(|r| r.city.is_some() || r.region.is_some())
                .count(),
        }
    }
}

/// Load a dataset and return the display rows of its best matches
#[inline]
pub fn match_file(matcher: &Matcher, path: &Path, skills: &str, top_k: usize) -> Result<Vec<MatchRow>> {
    let mut corpus = load_corpus(path)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
    info!("Loaded {} job records from {}", corpus.len(), path.display());

    let results = matcher.find_matches(skills, &mut corpus, top_k)?;
    Ok(results.iter().map(MatchResult::to_row).collect())
}

/// Validate a dataset file and print a short summary
#[inline]
pub fn validate_dataset(path: &Path) -> Result<()> {
    let corpus = load_corpus(path)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
    let summary = DatasetSummary::of(&corpus);

    eprintln!("{}", style("✓ Dataset is valid").green());
    eprintln!("  File: {}", style(path.display()).cyan());
    eprintln!("  Job records: {}", style(summary.records).cyan());
    eprintln!(
        "  Records with skills: {}",
        style(summary.records_with_skills).cyan()
    );
    eprintln!("  Distinct skills: {}", style(summary.distinct_skills).cyan());
    if summary.records_with_location > 0 {
        eprintln!(
            "  Records with a location: {}",
            style(summary.records_with_location).cyan()
        );
    }

    Ok(())
}

/// Match a skill list against a dataset file and print the best rows
#[inline]
pub async fn run_match(path: PathBuf, skills: String, top_k: Option<usize>) -> Result<()> {
    let config = Config::load_default()?;
    let top_k = top_k.unwrap_or(config.matching.top_k);
    let matcher = Matcher::from_config(&config);

    let spinner = if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .context("Invalid progress template")?,
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(format!(
        "Matching against {} using the {} backend",
        path.display(),
        config.embedding.provider
    ));

    let rows = tokio::task::spawn_blocking(move || match_file(&matcher, &path, &skills, top_k))
        .await
        .context("Matching task panicked")?;
    spinner.finish_and_clear();
    let rows = rows?;

    if rows.is_empty() {
        eprintln!("{}", style("No job records to match against.").yellow());
        return Ok(());
    }

    eprintln!(
        "{}",
        style(format!("Top {} matches", rows.len())).bold().cyan()
    );
    println!();
    for (rank, row) in rows.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(&row.title).bold(),
            style(format!("({})", row.score)).green()
        );
        if !row.company.is_empty() {
            println!("   Company: {}", row.company);
        }
        println!("   Skills: {}", style(&row.skills).dim());
    }

    Ok(())
}
