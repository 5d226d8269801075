/*!
 * scitrans - Scientific document translation with formula preservation
 *
 * Translates structured LaTeX-style documents between languages through a
 * generative model backend while enforcing two document-wide invariants:
 * every mathematical formula survives translation byte-identically (or as a
 * permitted inline reordering), and every domain term is rendered the same
 * way in every section.
 *
 * The pipeline parses the document into sections, asks the backend for a
 * section dependency graph, prepares a terminology dictionary against a
 * persistent similarity index, translates sections concurrently in
 * dependency order, validates formulas with bounded retries, and assembles
 * the translated document plus a structured run outcome.
 */

/// Application configuration
pub mod app_config;

/// End-to-end pipeline controller
pub mod app_controller;

/// Result assembly: translated document text and run outcome
pub mod assemble;

/// Section dependency analysis and ordering
pub mod dependency;

/// Document model, structural parsing, and formula extraction
pub mod document;

/// Error types
pub mod errors;

/// Model backend clients (OpenAI-compatible plus the scripted mock)
pub mod providers;

/// Terminology extraction, conflict resolution, and persistence
pub mod terminology;

/// Section translation: prompts, engine, orchestrator
pub mod translation;

/// Formula validation and paragraph marking
pub mod validation;

pub use app_config::Config;
pub use app_controller::Controller;
pub use document::{Document, RunOutcome, RunStatus};
pub use errors::{AppError, ProviderError, StructuralError, TranslationError};
