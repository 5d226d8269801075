/*!
 * Document model and structural parsing.
 *
 * This module turns raw LaTeX-style source text into a tree of sections and
 * paragraphs with formula spans carrying stable identity:
 *
 * - `model`: core data types shared across the pipeline
 * - `parser`: include flattening, section and paragraph splitting
 * - `formula`: the single, pure formula-span extraction routine
 */

pub mod formula;
pub mod model;
pub mod parser;

pub use formula::{extract_formulas, split_paragraphs};
pub use model::{
    DependencyEdge, Document, FormulaDiff, FormulaKind, FormulaSpan, Paragraph, RunOutcome,
    RunStatus, Section, SectionStatus, TermEntry, TranslationAttempt, ValidationResult,
    ValidationStatus,
};
pub use parser::StructuralParser;
