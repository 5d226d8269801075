/*!
 * Section translation pipeline.
 *
 * - `prompts`: prompt templates and the request builder, including the
 *   escalating-strictness formula instructions
 * - `engine`: whole-section translation against the model backend with the
 *   paragraph-count contract
 * - `orchestrator`: dependency-ordered, concurrency-bounded scheduling with
 *   the validation retry loop
 */

pub use self::engine::{SectionTranslation, TranslationEngine};
pub use self::orchestrator::{CancellationFlag, Orchestrator, SectionResult, TranslationState};
pub use self::prompts::{Strictness, TranslationPromptBuilder};

pub mod engine;
pub mod orchestrator;
pub mod prompts;
