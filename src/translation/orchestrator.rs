/*!
 * Dependency-ordered, concurrency-bounded section scheduling.
 *
 * Sections are started strictly in topological order: a section is eligible
 * only once every dependency has a completed translation. Independent
 * sections run concurrently under a semaphore sized by the provider's
 * request limit.
 *
 * Each section gets a retry budget of `max_retries + 1` attempts covering
 * both backend failures and formula mismatches. A section whose mismatches
 * survive the budget is carried through with visible markings; a section
 * whose requests keep failing falls back to its source text. Neither stops
 * the run.
 */

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::app_config::{Config, RetryGranularity};
use crate::document::{
    Document, Section, SectionStatus, TranslationAttempt, ValidationResult, ValidationStatus,
};
use crate::errors::TranslationError;
use crate::terminology::Dictionary;
use crate::validation::{mark_paragraph, FormulaValidator};

use super::engine::TranslationEngine;

/// Shared cancellation flag; setting it stops further scheduling
pub type CancellationFlag = Arc<AtomicBool>;

/// Final result for one section
#[derive(Debug, Clone)]
pub struct SectionResult {
    /// Section identifier
    pub section_id: String,
    /// Outcome category
    pub status: SectionStatus,
    /// Final paragraphs, markings applied where required
    pub paragraphs: Vec<String>,
    /// Final section text
    pub text: String,
    /// Validation results that remained marked
    pub marked: Vec<ValidationResult>,
}

impl SectionResult {
    fn translated(section_id: &str, paragraphs: Vec<String>) -> Self {
        Self {
            section_id: section_id.to_string(),
            status: SectionStatus::Translated,
            text: paragraphs.join("\n\n"),
            paragraphs,
            marked: Vec::new(),
        }
    }

    /// Failed sections carry their source text through unchanged
    fn failed(section: &Section) -> Self {
        Self {
            section_id: section.id.clone(),
            status: SectionStatus::Failed,
            paragraphs: section.paragraphs.iter().map(|p| p.text.clone()).collect(),
            text: section.content.trim().to_string(),
            marked: Vec::new(),
        }
    }
}

/// Accumulated run state: per-section results, completion order, and the
/// append-only attempt log
#[derive(Debug, Default)]
pub struct TranslationState {
    results: HashMap<String, SectionResult>,
    completion_order: Vec<String>,
    attempts: Vec<TranslationAttempt>,
}

impl TranslationState {
    /// Result for a section, if it has completed
    pub fn result(&self, section_id: &str) -> Option<&SectionResult> {
        self.results.get(section_id)
    }

    /// Whether a section has a completed (non-failed) translation
    pub fn is_translated(&self, section_id: &str) -> bool {
        self.results
            .get(section_id)
            .map(|r| r.status != SectionStatus::Failed)
            .unwrap_or(false)
    }

    /// All validation results that remained marked, in document order of
    /// completion
    pub fn marked_paragraphs(&self) -> Vec<ValidationResult> {
        self.completion_order
            .iter()
            .filter_map(|id| self.results.get(id))
            .flat_map(|r| r.marked.iter().cloned())
            .collect()
    }

    /// Identifiers of sections that failed entirely
    pub fn failed_sections(&self) -> Vec<String> {
        self.completion_order
            .iter()
            .filter(|id| !self.is_translated(id))
            .cloned()
            .collect()
    }

    /// Number of attempts logged for a section
    pub fn attempts_for(&self, section_id: &str) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.section_id == section_id)
            .count()
    }

    /// The full attempt log
    pub fn attempts(&self) -> &[TranslationAttempt] {
        &self.attempts
    }

    fn record(&mut self, result: SectionResult, attempts: Vec<TranslationAttempt>) {
        self.completion_order.push(result.section_id.clone());
        self.results.insert(result.section_id.clone(), result);
        self.attempts.extend(attempts);
    }

    /// Assemble dependency context for a section: dependency texts, most
    /// recently completed first, truncated to the budget. A failed
    /// dependency contributes its source text, so dependents still see the
    /// definitions it introduces.
    pub fn context_for(&self, dependencies: &BTreeSet<String>, budget_chars: usize) -> String {
        let mut context = String::new();
        for id in self.completion_order.iter().rev() {
            if !dependencies.contains(id) {
                continue;
            }
            let Some(result) = self.results.get(id) else {
                continue;
            };
            let block = format!("[{id}]:\n{}\n\n", result.text);
            if context.chars().count() + block.chars().count() > budget_chars {
                let remaining = budget_chars.saturating_sub(context.chars().count());
                context.extend(block.chars().take(remaining));
                break;
            }
            context.push_str(&block);
        }
        context.trim_end().to_string()
    }
}

/// Schedules section translation over a parsed document
pub struct Orchestrator {
    engine: TranslationEngine,
    validator: FormulaValidator,
    config: Config,
    semaphore: Arc<Semaphore>,
    cancel: CancellationFlag,
}

impl Orchestrator {
    /// Create an orchestrator bounded by the configured request limit
    pub fn new(engine: TranslationEngine, validator: FormulaValidator, config: &Config) -> Self {
        Self {
            engine,
            validator,
            config: config.clone(),
            semaphore: Arc::new(Semaphore::new(config.provider.concurrent_requests)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The flag that cancels this orchestrator's runs
    pub fn cancellation_flag(&self) -> CancellationFlag {
        Arc::clone(&self.cancel)
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Translate every section of the document in dependency order.
    ///
    /// `order` must be a topological order of the section identifiers, as
    /// produced by the dependency phase. Independent sections run
    /// concurrently; a section never starts before its dependencies finish.
    pub async fn run(
        &self,
        document: &Document,
        order: &[String],
        dictionary: &Dictionary,
    ) -> Result<TranslationState, TranslationError> {
        let state = Arc::new(Mutex::new(TranslationState::default()));
        let dictionary = Arc::new(dictionary.clone());
        let mut pending: Vec<String> = order.to_vec();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut tasks: JoinSet<(SectionResult, Vec<TranslationAttempt>)> = JoinSet::new();

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                // Abort in-flight requests; their partial results are
                // discarded. Completed translations stay recorded, so a
                // later run resumes from the first untranslated section.
                tasks.shutdown().await;
                let mut locked = state.lock();
                for id in in_flight.iter().chain(pending.iter()) {
                    if let Some(section) = document.section(id) {
                        warn!("Section '{}' cancelled; carrying source text through", id);
                        locked.record(SectionResult::failed(section), Vec::new());
                    }
                }
                break;
            }

            // Schedule every section whose dependencies have completed
            let mut scheduled = Vec::new();
            for id in &pending {
                let Some(section) = document.section(id) else {
                    continue;
                };
                let ready = {
                    let locked = state.lock();
                    section
                        .dependencies
                        .iter()
                        .all(|dep| locked.result(dep).is_some())
                };
                if !ready {
                    continue;
                }

                let context = state
                    .lock()
                    .context_for(&section.dependencies, self.config.translation.context_budget_chars);
                let section = section.clone();
                let engine = self.engine.clone();
                let validator = self.validator;
                let config = self.config.clone();
                let dictionary = Arc::clone(&dictionary);
                let semaphore = Arc::clone(&self.semaphore);

                scheduled.push(id.clone());
                in_flight.insert(id.clone());
                tasks.spawn(async move {
                    // Closed only on runtime shutdown
                    let _permit = semaphore.acquire().await;
                    translate_with_retries(&engine, &validator, &config, &section, &dictionary, &context)
                        .await
                });
            }
            pending.retain(|id| !scheduled.contains(id));

            if tasks.is_empty() {
                if !pending.is_empty() {
                    // A dependency can never complete; the order was not
                    // topological or references a failed lookup.
                    let id = pending[0].clone();
                    let dep = document
                        .section(&id)
                        .and_then(|s| {
                            let locked = state.lock();
                            s.dependencies
                                .iter()
                                .find(|d| locked.result(d).is_none())
                                .cloned()
                        })
                        .unwrap_or_default();
                    return Err(TranslationError::DependencyPending {
                        section_id: id,
                        dependency_id: dep,
                    });
                }
                break;
            }

            if let Some(joined) = tasks.join_next().await {
                let (result, attempts) =
                    joined.map_err(|e| TranslationError::Cancelled(e.to_string()))?;
                info!(
                    "Section '{}' finished: {:?}",
                    result.section_id, result.status
                );
                in_flight.remove(&result.section_id);
                state.lock().record(result, attempts);
            }
        }

        let state = Arc::try_unwrap(state)
            .map_err(|_| TranslationError::Cancelled("state still shared".to_string()))?
            .into_inner();
        Ok(state)
    }

    /// Translate one section against an existing state. Rejects the section
    /// when a dependency has no completed translation yet.
    pub async fn translate_one(
        &self,
        document: &Document,
        section_id: &str,
        dictionary: &Dictionary,
        state: &mut TranslationState,
    ) -> Result<SectionStatus, TranslationError> {
        let section = document
            .section(section_id)
            .ok_or_else(|| TranslationError::RetriesExhausted {
                section_id: section_id.to_string(),
                attempts: 0,
                reason: "unknown section".to_string(),
            })?;

        for dependency in &section.dependencies {
            if state.result(dependency).is_none() {
                return Err(TranslationError::DependencyPending {
                    section_id: section_id.to_string(),
                    dependency_id: dependency.clone(),
                });
            }
        }

        let context = state.context_for(
            &section.dependencies,
            self.config.translation.context_budget_chars,
        );
        let (result, attempts) = translate_with_retries(
            &self.engine,
            &self.validator,
            &self.config,
            section,
            dictionary,
            &context,
        )
        .await;
        let status = result.status.clone();
        state.record(result, attempts);
        Ok(status)
    }
}

/// Run the per-section retry loop: up to `max_retries + 1` attempts shared
/// between backend failures and formula mismatches.
async fn translate_with_retries(
    engine: &TranslationEngine,
    validator: &FormulaValidator,
    config: &Config,
    section: &Section,
    dictionary: &Dictionary,
    context: &str,
) -> (SectionResult, Vec<TranslationAttempt>) {
    let budget = config.translation.max_retries + 1;
    let mut attempts: Vec<TranslationAttempt> = Vec::new();
    let mut last_failure = String::new();
    // Best mismatched attempt so far, kept for marking on exhaustion
    let mut candidate: Option<(Vec<String>, Vec<ValidationResult>)> = None;

    for attempt in 1..=budget {
        let outcome = match (&candidate, config.translation.retry_granularity) {
            (Some(_), RetryGranularity::Paragraph) => {
                retry_paragraphs(
                    engine,
                    validator,
                    section,
                    dictionary,
                    context,
                    attempt,
                    candidate.take().unwrap_or_default(),
                )
                .await
            }
            _ => match engine
                .translate_section(section, dictionary, context, attempt)
                .await
            {
                Ok(translation) => {
                    let results = validator.validate_section(section, &translation.paragraphs);
                    Ok((translation.paragraphs, results))
                }
                Err(e) => Err(e),
            },
        };

        match outcome {
            Ok((paragraphs, results)) => {
                attempts.push(TranslationAttempt {
                    section_id: section.id.clone(),
                    attempt,
                    text: paragraphs.join("\n\n"),
                    timestamp: Utc::now(),
                });
                if results.iter().all(ValidationResult::is_ok) {
                    return (
                        SectionResult::translated(&section.id, paragraphs),
                        attempts,
                    );
                }
                let mismatched = results.iter().filter(|r| !r.is_ok()).count();
                warn!(
                    "Section '{}' attempt {}: {} paragraph(s) with formula mismatches",
                    section.id, attempt, mismatched
                );
                candidate = Some((paragraphs, results));
            }
            Err(e) => {
                warn!("Section '{}' attempt {} failed: {}", section.id, attempt, e);
                last_failure = e.to_string();
            }
        }
    }

    match candidate {
        Some((paragraphs, results)) => (
            mark_exhausted(config, section, paragraphs, results),
            attempts,
        ),
        None => {
            warn!(
                "Section '{}' failed after {} attempts: {}; carrying source text through",
                section.id, budget, last_failure
            );
            (SectionResult::failed(section), attempts)
        }
    }
}

/// Paragraph retry granularity: retranslate only the mismatched paragraphs
/// of the best attempt so far
async fn retry_paragraphs(
    engine: &TranslationEngine,
    validator: &FormulaValidator,
    section: &Section,
    dictionary: &Dictionary,
    context: &str,
    attempt: usize,
    candidate: (Vec<String>, Vec<ValidationResult>),
) -> Result<(Vec<String>, Vec<ValidationResult>), TranslationError> {
    let (mut paragraphs, results) = candidate;

    for result in results.iter().filter(|r| !r.is_ok()) {
        let index = result.paragraph_index;
        let Some(source) = section.paragraphs.get(index) else {
            continue;
        };
        match engine
            .translate_paragraph(section, source, dictionary, context, attempt)
            .await
        {
            Ok(text) => paragraphs[index] = text,
            // Keep the previous rendering; the mismatch stays visible
            Err(e) => warn!(
                "Paragraph {} of section '{}' retry failed: {}",
                index, section.id, e
            ),
        }
    }

    let results = validator.validate_section(section, &paragraphs);
    Ok((paragraphs, results))
}

/// Apply markings to the paragraphs whose mismatches survived the budget
fn mark_exhausted(
    config: &Config,
    section: &Section,
    mut paragraphs: Vec<String>,
    results: Vec<ValidationResult>,
) -> SectionResult {
    let mut marked = Vec::new();
    for mut result in results {
        if result.is_ok() {
            continue;
        }
        result.status = ValidationStatus::Marked;
        if config.output.mark_problematic {
            if let (Some(paragraph), Some(diff)) =
                (paragraphs.get_mut(result.paragraph_index), &result.diff)
            {
                *paragraph = mark_paragraph(paragraph, diff, &config.output.mark_color);
            }
        }
        marked.push(result);
    }

    SectionResult {
        section_id: section.id.clone(),
        status: SectionStatus::Marked(marked.len()),
        text: paragraphs.join("\n\n"),
        paragraphs,
        marked,
    }
}
