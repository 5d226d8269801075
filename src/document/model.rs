/*!
 * Core data types for document translation.
 *
 * The parsed `Document` is immutable; all translation state accumulates in
 * separate structures so the translated artifact is never an in-place
 * mutation of the source.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of a formula span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaKind {
    /// `$...$`
    Inline,
    /// `$$...$$`, `\[...\]`, equation/align/gather/multline/eqnarray environments
    Display,
}

/// A maximal substring recognized as mathematical notation.
///
/// Immutable once extracted. Identity is the extraction position within the
/// owning paragraph, which is stable because extraction is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaSpan {
    /// Kind of delimiter the span was recognized by
    pub kind: FormulaKind,
    /// Raw notation text between the delimiters
    pub notation: String,
    /// Byte offset of the span within its paragraph
    pub position: usize,
}

/// Minimal translation-validation unit within a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// 0-based index within the owning section
    pub index: usize,
    /// Raw paragraph text
    pub text: String,
    /// Ordered formula spans extracted from `text`
    pub formulas: Vec<FormulaSpan>,
}

/// Top-level structural unit of the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier, `sec_N` in document order
    pub id: String,
    /// Section title
    pub title: String,
    /// Nesting level: 1 section, 2 subsection, 3 subsubsection; 0 synthetic
    pub level: usize,
    /// Raw section content (between this heading and the next)
    pub content: String,
    /// Ordered paragraphs
    pub paragraphs: Vec<Paragraph>,
    /// Identifiers of sections this one reads results of.
    /// Empty until the dependency phase assigns them.
    pub dependencies: BTreeSet<String>,
}

impl Section {
    /// Heading command for this section's level, if it carries one
    pub fn heading_command(&self) -> Option<&'static str> {
        match self.level {
            1 => Some("section"),
            2 => Some("subsection"),
            3 => Some("subsubsection"),
            _ => None,
        }
    }
}

/// Root container for a parsed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path of the root source file
    pub source_path: String,
    /// Everything before `\begin{document}`
    pub preamble: String,
    /// Everything after `\end{document}`
    pub postamble: String,
    /// Whether the source carried a `\begin{document}` envelope, even an
    /// empty-preamble one; reassembly re-emits it only when this is set
    pub has_envelope: bool,
    /// Ordered sections
    pub sections: Vec<Section>,
}

impl Document {
    /// Look up a section by identifier
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Document-order position of a section, used as the stable tie-break
    pub fn section_position(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }
}

/// A terminology entry persisted across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    /// Term in the source language
    pub source: String,
    /// Canonical rendering in the target language
    pub target: String,
    /// Surrounding context captured at extraction time
    #[serde(default)]
    pub context: String,
    /// Confidence of the mapping, 1.0 for fresh extractions
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Whether a human (or policy) approved the mapping
    #[serde(default)]
    pub approved: bool,
}

fn default_confidence() -> f32 {
    1.0
}

impl TermEntry {
    /// Create a fresh, unapproved entry
    pub fn new(source: &str, target: &str, context: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            context: context.to_string(),
            confidence: 1.0,
            approved: false,
        }
    }
}

/// Directed dependency: `from` reads results of `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

/// One produced translation for a unit. Append-only per run; the last
/// attempt for a unit is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationAttempt {
    /// Section the attempt belongs to
    pub section_id: String,
    /// 1-based attempt number
    pub attempt: usize,
    /// Text the backend produced
    pub text: String,
    /// When the attempt completed
    pub timestamp: DateTime<Utc>,
}

/// Validation status of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Formula sets/sequences match
    Ok,
    /// Formulas differ; retries may still resolve it
    Mismatch,
    /// Retries exhausted; the paragraph carries a visible marking
    Marked,
}

/// Structured description of a formula mismatch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaDiff {
    /// Inline formulas present in the source but absent from the translation
    pub missing_inline: Vec<String>,
    /// Inline formulas present in the translation but absent from the source
    pub extra_inline: Vec<String>,
    /// Human-readable description of display-sequence differences
    pub display_mismatch: Option<String>,
}

impl FormulaDiff {
    /// Whether the diff records any difference
    pub fn is_empty(&self) -> bool {
        self.missing_inline.is_empty()
            && self.extra_inline.is_empty()
            && self.display_mismatch.is_none()
    }

    /// Render the diff as a single summary line for footnotes and reports
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_inline.is_empty() {
            parts.push(format!(
                "Missing inline formulas: {}",
                self.missing_inline
                    .iter()
                    .map(|f| format!("${f}$"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if !self.extra_inline.is_empty() {
            parts.push(format!(
                "Extra inline formulas: {}",
                self.extra_inline
                    .iter()
                    .map(|f| format!("${f}$"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if let Some(display) = &self.display_mismatch {
            parts.push(display.clone());
        }
        parts.join("; ")
    }
}

/// Outcome of validating one (source, translated) paragraph pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Owning section
    pub section_id: String,
    /// Paragraph index within the section
    pub paragraph_index: usize,
    /// Current status
    pub status: ValidationStatus,
    /// Diff description when status is not Ok
    pub diff: Option<FormulaDiff>,
}

impl ValidationResult {
    /// A passing result
    pub fn ok(section_id: &str, paragraph_index: usize) -> Self {
        Self {
            section_id: section_id.to_string(),
            paragraph_index,
            status: ValidationStatus::Ok,
            diff: None,
        }
    }

    /// A failing result carrying its diff
    pub fn mismatch(section_id: &str, paragraph_index: usize, diff: FormulaDiff) -> Self {
        Self {
            section_id: section_id.to_string(),
            paragraph_index,
            status: ValidationStatus::Mismatch,
            diff: Some(diff),
        }
    }

    /// Whether the pair passed
    pub fn is_ok(&self) -> bool {
        self.status == ValidationStatus::Ok
    }
}

/// Per-section outcome recorded in the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum SectionStatus {
    /// Translated and all formulas verified
    Translated,
    /// Translated, but some paragraphs carry markings
    Marked(usize),
    /// Translation failed; source text was carried through
    Failed,
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// All formulas verified, no failed sections
    Success,
    /// Output produced, but some paragraphs are marked or sections failed
    CompletedWithMarkings,
    /// Fatal failure before output could be produced
    Failed,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::CompletedWithMarkings => 1,
            Self::Failed => 2,
        }
    }
}

/// Structured outcome consumed by the external report renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Overall status
    pub status: RunStatus,
    /// Unique identifier of this run
    pub run_id: String,
    /// SHA-256 of the flattened source
    pub source_hash: String,
    /// Per-section statuses in document order
    pub sections: Vec<(String, SectionStatus)>,
    /// Paragraphs that remained marked, with their diffs
    pub marked_paragraphs: Vec<ValidationResult>,
    /// Sections whose translation failed entirely
    pub failed_sections: Vec<String>,
    /// Final terminology dictionary used for the run
    pub dictionary: Vec<(String, String)>,
    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
}

impl RunOutcome {
    /// Number of marked paragraphs
    pub fn marked_count(&self) -> usize {
        self.marked_paragraphs.len()
    }
}
