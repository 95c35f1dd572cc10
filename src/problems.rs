//! Label assignment, dedup-aware store and filtered similarity search.
//!
//! `ProblemBank` is the policy layer over the embedder and the vector index.
//! It holds no state of its own; the index is the sole source of truth for
//! stored problems.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::errors::AppError;
use crate::index::{ProblemMetadata, ProblemRecord, VectorIndex};

/// Returned when no stored neighbor clears the labeling threshold.
pub const FALLBACK_LABEL: &str = "その他 - その他";

/// A similar-problem search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarProblem {
    pub text: String,
    pub labels: Vec<String>,
    pub score: f32,
}

/// Result of a batch ingestion run. The web layer owns the response shape
/// and builds its JSON itself.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Lines processed (duplicates are counted; they are skipped silently)
    pub stored: usize,
    /// Parsed label lists, one per line, in input order
    pub labels: Vec<Vec<String>>,
}

pub struct ProblemBank {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,

    label_threshold: f32,
    label_top_k: usize,
    dedup_threshold: f32,
    search_top_k: usize,
}

impl ProblemBank {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, config: &Config) -> Self {
        Self {
            embedder,
            index,
            label_threshold: config.labeling.threshold,
            label_top_k: config.labeling.top_k,
            dedup_threshold: config.dedup.threshold,
            search_top_k: config.search.top_k,
        }
    }

    /// Suggest labels for a problem text.
    ///
    /// Unions the labels of every neighbor scoring at or above the
    /// threshold. An empty index or no qualifying neighbor yields the
    /// fallback label; this is not an error.
    pub fn assign_labels(&self, text: &str) -> Result<Vec<String>, AppError> {
        let text = non_empty(text)?;

        let vector = self.embedder.embed(text)?;
        let matches = self.index.query(&vector, self.label_top_k, None)?;

        let mut labels = BTreeSet::new();
        for m in matches {
            if m.score >= self.label_threshold && !m.metadata.labels.is_empty() {
                labels.extend(m.metadata.labels);
            }
        }

        if labels.is_empty() {
            return Ok(vec![FALLBACK_LABEL.to_string()]);
        }

        Ok(labels.into_iter().collect())
    }

    /// Store a problem with confirmed labels. Returns whether a record was
    /// actually inserted.
    ///
    /// The nearest neighbor is checked first: a score above the dedup
    /// threshold alone is not enough to skip, the stored text must also be
    /// byte-identical. Two concurrent stores of the same text can both pass
    /// this check; the index offers no conditional insert, so that race is
    /// accepted.
    pub fn store(&self, text: &str, labels: Vec<String>) -> Result<bool, AppError> {
        let text = non_empty(text)?;

        let vector = self.embedder.embed(text)?;

        let existing = self.index.query(&vector, 1, None)?;
        if let Some(top) = existing.first() {
            if top.score > self.dedup_threshold && top.metadata.text == text {
                log::warn!("duplicate text, store skipped: {text}");
                return Ok(false);
            }
        }

        let id = rusty_ulid::generate_ulid_string();
        self.index.upsert(ProblemRecord {
            id: id.clone(),
            values: vector,
            metadata: ProblemMetadata {
                text: text.to_string(),
                labels,
            },
        })?;

        log::info!("stored problem {id}: {text}");
        Ok(true)
    }

    /// Search problems similar to `text` within the given label set.
    ///
    /// A stored problem whose text is identical to the query never
    /// recommends itself.
    pub fn search_similar(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Vec<SimilarProblem>, AppError> {
        let text = non_empty(text)?;

        let vector = self.embedder.embed(text)?;
        let matches = self.index.query(&vector, self.search_top_k, Some(labels))?;

        Ok(matches
            .into_iter()
            .filter(|m| m.metadata.text != text)
            .map(|m| SimilarProblem {
                text: m.metadata.text,
                labels: m.metadata.labels,
                score: m.score,
            })
            .collect())
    }

    /// Ingest a multi-line batch, one `label1,label2:problem text` record per
    /// line. Blank lines are skipped. A line missing the separator fails the
    /// whole request.
    pub fn store_batch(&self, body: &str) -> Result<BatchOutcome, AppError> {
        let mut stored = 0;
        let mut all_labels = Vec::new();

        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (labels, text) = parse_batch_line(line)?;

            self.store(text, labels.clone())?;
            stored += 1;
            all_labels.push(labels);
        }

        Ok(BatchOutcome {
            stored,
            labels: all_labels,
        })
    }
}

/// Split a batch line on the first colon into labels and problem text.
pub fn parse_batch_line(line: &str) -> Result<(Vec<String>, &str), AppError> {
    let (label_part, text) = line
        .split_once(':')
        .ok_or_else(|| AppError::MalformedLine(line.to_string()))?;

    Ok((parse_labels(label_part), text.trim()))
}

/// Split a comma-separated label list, trimming whitespace and dropping
/// empties.
pub fn parse_labels(labels: &str) -> Vec<String> {
    labels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyText);
    }
    Ok(text)
}
