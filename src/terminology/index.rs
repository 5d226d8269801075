/*!
 * Similarity-index collaborator interface.
 *
 * The index answers "which stored terms are closest to this one" and accepts
 * atomic upserts. Its persistence lifecycle is owned externally; the crate
 * ships a sqlite-backed implementation and an in-memory one for tests.
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::document::TermEntry;

/// A stored term with its similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredTerm {
    /// The stored entry
    pub entry: TermEntry,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Similarity index over persisted terminology entries.
///
/// Reads may run concurrently; `upsert` is atomic per source term, so two
/// concurrent candidates for the same term can never leave divergent entries.
#[async_trait]
pub trait TermIndex: Send + Sync + Debug {
    /// The K nearest stored entries to `embedding`, best first
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredTerm>>;

    /// Insert or replace the entry for `entry.source`
    async fn upsert(&self, entry: TermEntry, embedding: Vec<f32>) -> Result<()>;
}

/// Cosine similarity between two vectors; 0.0 when either is degenerate
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// In-memory index for tests and single-run usage
#[derive(Debug, Default, Clone)]
pub struct InMemoryTermIndex {
    entries: Arc<RwLock<HashMap<String, (TermEntry, Vec<f32>)>>>,
}

impl InMemoryTermIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the index with an entry (test helper)
    pub fn with_entry(self, entry: TermEntry, embedding: Vec<f32>) -> Self {
        self.entries
            .write()
            .insert(entry.source.clone(), (entry, embedding));
        self
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TermIndex for InMemoryTermIndex {
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredTerm>> {
        let entries = self.entries.read();
        let mut scored: Vec<ScoredTerm> = entries
            .values()
            .map(|(entry, stored)| ScoredTerm {
                entry: entry.clone(),
                similarity: cosine_similarity(embedding, stored),
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        Ok(scored)
    }

    async fn upsert(&self, entry: TermEntry, embedding: Vec<f32>) -> Result<()> {
        self.entries
            .write()
            .insert(entry.source.clone(), (entry, embedding));
        Ok(())
    }
}
