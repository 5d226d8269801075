/*!
 * Conflict-resolution capability for terminology.
 *
 * When a candidate translation disagrees with a sufficiently similar stored
 * entry, a resolver decides which rendering wins. The store invokes the
 * resolver polymorphically and is indifferent to which concrete one is
 * wired in; interactive front-ends implement this trait and block until
 * the user has decided.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::document::TermEntry;

use super::index::ScoredTerm;

/// Decision for one terminology conflict
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Keep the stored translation
    KeepExisting,
    /// Use the freshly extracted candidate
    UseCandidate,
    /// Use a replacement supplied by the resolver
    Replace(String),
}

/// Decides between a candidate term and a conflicting stored entry
#[async_trait]
pub trait ConflictResolver: Send + Sync + Debug {
    /// Resolve one conflict. Implementations may block (interactive mode);
    /// the store waits for the decision before continuing with this term.
    async fn resolve(&self, candidate: &TermEntry, existing: &ScoredTerm) -> Resolution;
}

/// Auto mode: the stored translation always wins
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoResolver;

#[async_trait]
impl ConflictResolver for AutoResolver {
    async fn resolve(&self, _candidate: &TermEntry, _existing: &ScoredTerm) -> Resolution {
        Resolution::KeepExisting
    }
}

/// Plays back a fixed sequence of decisions; stands in for an interactive
/// resolver in tests. Falls back to keeping the stored entry when the
/// script runs dry.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    decisions: Mutex<VecDeque<Resolution>>,
}

impl ScriptedResolver {
    /// Create a resolver from a decision sequence
    pub fn new(decisions: Vec<Resolution>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
        }
    }
}

#[async_trait]
impl ConflictResolver for ScriptedResolver {
    async fn resolve(&self, _candidate: &TermEntry, _existing: &ScoredTerm) -> Resolution {
        self.decisions
            .lock()
            .pop_front()
            .unwrap_or(Resolution::KeepExisting)
    }
}
