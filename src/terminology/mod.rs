/*!
 * Terminology extraction and management.
 *
 * Phase 1 asks the model backend for candidate (source, target) term pairs
 * across the whole document. Phase 2 resolves each candidate against the
 * similarity index: a sufficiently similar stored entry with a different
 * translation is a conflict, decided by the wired-in `ConflictResolver`.
 * The final dictionary maps each source term to exactly one target term and
 * every resolved entry is persisted back to the index once per run.
 */

use anyhow::Result;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::app_config::TerminologyConfig;
use crate::dependency::extract_json_block;
use crate::document::{Document, TermEntry};
use crate::providers::{ChatRequest, ModelBackend};

pub mod index;
pub mod resolver;
pub mod sqlite;

pub use index::{cosine_similarity, InMemoryTermIndex, ScoredTerm, TermIndex};
pub use resolver::{AutoResolver, ConflictResolver, Resolution, ScriptedResolver};
pub use sqlite::SqliteTermIndex;

/// System prompt for term extraction
const EXTRACTION_SYSTEM_PROMPT: &str = "You are a scientific terminology specialist. \
You extract domain terms and propose precise translations for them.";

/// Per-section character budget in the extraction prompt
const SECTION_PREVIEW_CHARS: usize = 1000;

/// Whole-prompt character budget for document content
const CONTENT_BUDGET_CHARS: usize = 15000;

#[derive(Debug, Deserialize)]
struct TermsResponse {
    #[serde(default)]
    terms: Vec<CandidateTerm>,
}

#[derive(Debug, Deserialize)]
struct CandidateTerm {
    source: String,
    target: String,
    #[serde(default)]
    context: String,
}

/// Final terminology dictionary: one target per source term
pub type Dictionary = BTreeMap<String, String>;

/// Manages terminology extraction, conflict resolution, and persistence
pub struct TerminologyStore {
    backend: Arc<dyn ModelBackend>,
    index: Arc<dyn TermIndex>,
    resolver: Arc<dyn ConflictResolver>,
    config: TerminologyConfig,
    /// Retry attempts for an unparseable extraction response
    retries: usize,
}

impl TerminologyStore {
    /// Create a store over a backend, index, and resolver capability
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        index: Arc<dyn TermIndex>,
        resolver: Arc<dyn ConflictResolver>,
        config: TerminologyConfig,
        retries: usize,
    ) -> Self {
        Self {
            backend,
            index,
            resolver,
            config,
            retries,
        }
    }

    /// Run both phases and persist the outcome: extract candidates, resolve
    /// each against the index, upsert the resolved entries exactly once.
    pub async fn prepare(
        &self,
        document: &Document,
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<TermEntry>> {
        let candidates = self
            .extract_candidates(document, source_language, target_language)
            .await;
        info!("Extracted {} terminology candidates", candidates.len());

        let resolved = self.resolve_candidates(candidates).await?;
        self.persist(&resolved).await?;
        Ok(resolved)
    }

    /// Phase 1: one extraction request per document.
    ///
    /// Degrades to an empty candidate list when the response stays
    /// unparseable after bounded retries; terminology is an aid, not a
    /// precondition.
    pub async fn extract_candidates(
        &self,
        document: &Document,
        source_language: &str,
        target_language: &str,
    ) -> Vec<TermEntry> {
        let prompt = build_extraction_prompt(document, source_language, target_language);

        for attempt in 0..=self.retries {
            let request = ChatRequest::new(EXTRACTION_SYSTEM_PROMPT, prompt.clone());
            match self.backend.complete(request).await {
                Ok(response) => match parse_terms(&response) {
                    Some(terms) => {
                        return terms
                            .into_iter()
                            .map(|t| TermEntry::new(&t.source, &t.target, &t.context))
                            .collect();
                    }
                    None => warn!(
                        "Unparseable terminology response (attempt {}/{})",
                        attempt + 1,
                        self.retries + 1
                    ),
                },
                Err(e) => warn!(
                    "Terminology extraction request failed (attempt {}/{}): {}",
                    attempt + 1,
                    self.retries + 1,
                    e
                ),
            }
        }

        warn!("Terminology extraction degraded to an empty candidate list");
        Vec::new()
    }

    /// Phase 2: resolve candidates against the similarity index
    pub async fn resolve_candidates(&self, candidates: Vec<TermEntry>) -> Result<Vec<TermEntry>> {
        let mut resolved = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let entry = self.resolve_one(candidate).await?;
            resolved.push(entry);
        }

        Ok(resolved)
    }

    /// Resolve a single candidate, consulting the resolver on conflicts
    async fn resolve_one(&self, candidate: TermEntry) -> Result<TermEntry> {
        let query = embedding_text(&candidate);
        let embedding = match self.backend.embed(&query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(
                    "Embedding failed for term '{}', keeping candidate as-is: {}",
                    candidate.source, e
                );
                return Ok(candidate);
            }
        };

        let matches = self
            .index
            .nearest(&embedding, self.config.nearest_terms)
            .await?;
        let Some(best) = matches.first() else {
            return Ok(candidate);
        };

        if best.similarity < self.config.similarity_threshold {
            return Ok(candidate);
        }

        if best.entry.target == candidate.target {
            // Same rendering: adopt the stored provenance
            return Ok(TermEntry {
                confidence: best.similarity,
                approved: best.entry.approved,
                ..candidate
            });
        }

        debug!(
            "Terminology conflict for '{}': candidate '{}' vs stored '{}' (similarity {:.3})",
            candidate.source, candidate.target, best.entry.target, best.similarity
        );

        let entry = match self.resolver.resolve(&candidate, best).await {
            Resolution::KeepExisting => TermEntry {
                target: best.entry.target.clone(),
                confidence: best.similarity,
                approved: best.entry.approved,
                ..candidate
            },
            Resolution::UseCandidate => candidate,
            Resolution::Replace(target) => TermEntry {
                target,
                approved: true,
                ..candidate
            },
        };
        Ok(entry)
    }

    /// Persist resolved entries, at most once per source term per run
    pub async fn persist(&self, entries: &[TermEntry]) -> Result<()> {
        let mut persisted: HashSet<&str> = HashSet::new();

        for entry in entries {
            if !persisted.insert(entry.source.as_str()) {
                continue;
            }
            let embedding = match self.backend.embed(&embedding_text(entry)).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("Skipping persistence of '{}': {}", entry.source, e);
                    continue;
                }
            };
            self.index.upsert(entry.clone(), embedding).await?;
        }

        Ok(())
    }
}

/// Build the one-to-one dictionary enforced during translation
pub fn build_dictionary(entries: &[TermEntry]) -> Dictionary {
    let mut dictionary = Dictionary::new();
    for entry in entries {
        dictionary.insert(entry.source.clone(), entry.target.clone());
    }
    dictionary
}

/// Text embedded for a term: the term plus its surrounding context
fn embedding_text(entry: &TermEntry) -> String {
    if entry.context.is_empty() {
        entry.source.clone()
    } else {
        format!("{} {}", entry.source, entry.context)
    }
}

/// Concatenated section previews under the prompt budget
fn build_extraction_prompt(
    document: &Document,
    source_language: &str,
    target_language: &str,
) -> String {
    let mut content = String::new();
    for section in &document.sections {
        let preview: String = section.content.chars().take(SECTION_PREVIEW_CHARS).collect();
        content.push_str(&format!("## {}\n{}\n\n", section.title, preview));
        if content.len() > CONTENT_BUDGET_CHARS {
            break;
        }
    }
    if content.len() > CONTENT_BUDGET_CHARS {
        let mut cut = CONTENT_BUDGET_CHARS;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
        content.push_str("\n...");
    }

    format!(
        r#"Extract the domain-specific terminology from this scientific text written in {source_language} and propose a translation for each term into {target_language}.

Focus on recurring technical terms whose rendering must stay consistent across the whole document. Skip common words and LaTeX commands.

TEXT:
{content}

Return the result as JSON:
{{
  "terms": [
    {{"source": "...", "target": "...", "context": "short phrase where the term occurs"}}
  ]
}}"#
    )
}

/// Parse the backend's terminology JSON, tolerating markdown fences
fn parse_terms(response: &str) -> Option<Vec<CandidateTerm>> {
    let json = extract_json_block(response);
    let parsed: TermsResponse = serde_json::from_str(json.trim()).ok()?;
    Some(parsed.terms)
}
