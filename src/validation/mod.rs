/*!
 * Formula validation between source and translated paragraphs.
 *
 * This is the system's primary correctness contract: formula content is
 * inviolate, surrounding prose is free to be rewritten. Inline spans are
 * compared as a multiset (a translator may relocate a formula with its
 * clause), display spans as an ordered sequence (they are referenced by
 * position elsewhere in the document).
 *
 * Spans are re-extracted from translated text with the same routine the
 * structural parser uses; a second extraction path would drift and produce
 * false mismatches.
 */

use std::collections::HashMap;

use crate::app_config::FormulaCompareMode;
use crate::document::{
    extract_formulas, FormulaDiff, FormulaKind, FormulaSpan, Paragraph, Section, ValidationResult,
};

pub mod marking;

pub use marking::mark_paragraph;

/// Validates formula preservation across a translation
#[derive(Debug, Clone, Copy)]
pub struct FormulaValidator {
    mode: FormulaCompareMode,
}

impl Default for FormulaValidator {
    fn default() -> Self {
        Self::new(FormulaCompareMode::Lenient)
    }
}

impl FormulaValidator {
    /// Create a validator with the given comparison mode
    pub fn new(mode: FormulaCompareMode) -> Self {
        Self { mode }
    }

    /// Validate every paragraph pair of a section.
    ///
    /// The orchestrator enforces equal paragraph counts before this runs;
    /// if counts still differ the section degrades to a whole-block
    /// comparison attributed to paragraph 0.
    pub fn validate_section(
        &self,
        section: &Section,
        translated_paragraphs: &[String],
    ) -> Vec<ValidationResult> {
        if section.paragraphs.len() != translated_paragraphs.len() {
            let source_whole = section
                .paragraphs
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let translated_whole = translated_paragraphs.join("\n\n");
            let result = self.validate_pair(&section.id, 0, &source_whole, &translated_whole);
            return vec![result];
        }

        section
            .paragraphs
            .iter()
            .zip(translated_paragraphs)
            .map(|(source, translated)| self.validate_paragraph(&section.id, source, translated))
            .collect()
    }

    /// Validate one parsed source paragraph against its translation
    pub fn validate_paragraph(
        &self,
        section_id: &str,
        source: &Paragraph,
        translated: &str,
    ) -> ValidationResult {
        self.compare(section_id, source.index, &source.formulas, translated)
    }

    /// Validate raw text pairs (whole-section degraded path)
    pub fn validate_pair(
        &self,
        section_id: &str,
        index: usize,
        source: &str,
        translated: &str,
    ) -> ValidationResult {
        let source_spans = match extract_formulas(source) {
            Ok(spans) => spans,
            Err(e) => {
                // Source text was already parsed once, so this is unreachable
                // in practice; degrade to a mismatch rather than panic.
                return ValidationResult::mismatch(
                    section_id,
                    index,
                    extraction_failure_diff(&e.to_string()),
                );
            }
        };
        self.compare(section_id, index, &source_spans, translated)
    }

    fn compare(
        &self,
        section_id: &str,
        index: usize,
        source_spans: &[FormulaSpan],
        translated: &str,
    ) -> ValidationResult {
        let translated_spans = match extract_formulas(translated) {
            Ok(spans) => spans,
            Err(e) => {
                return ValidationResult::mismatch(
                    section_id,
                    index,
                    extraction_failure_diff(&e.to_string()),
                );
            }
        };

        let diff = self.diff_spans(source_spans, &translated_spans);
        if diff.is_empty() {
            ValidationResult::ok(section_id, index)
        } else {
            ValidationResult::mismatch(section_id, index, diff)
        }
    }

    /// Compute the diff between two span lists under the comparison mode
    pub fn diff_spans(&self, source: &[FormulaSpan], translated: &[FormulaSpan]) -> FormulaDiff {
        let mut diff = FormulaDiff::default();

        // Inline: multiset of notation strings, order ignored
        let mut counts: HashMap<String, i64> = HashMap::new();
        for span in source.iter().filter(|s| s.kind == FormulaKind::Inline) {
            *counts.entry(self.normalize(&span.notation)).or_default() += 1;
        }
        for span in translated.iter().filter(|s| s.kind == FormulaKind::Inline) {
            *counts.entry(self.normalize(&span.notation)).or_default() -= 1;
        }
        let mut keyed: Vec<(String, i64)> = counts.into_iter().collect();
        keyed.sort();
        for (notation, count) in keyed {
            if count > 0 {
                for _ in 0..count {
                    diff.missing_inline.push(notation.clone());
                }
            } else if count < 0 {
                for _ in 0..-count {
                    diff.extra_inline.push(notation.clone());
                }
            }
        }

        // Display: ordered sequence of notation strings
        let source_display: Vec<String> = source
            .iter()
            .filter(|s| s.kind == FormulaKind::Display)
            .map(|s| self.normalize(&s.notation))
            .collect();
        let translated_display: Vec<String> = translated
            .iter()
            .filter(|s| s.kind == FormulaKind::Display)
            .map(|s| self.normalize(&s.notation))
            .collect();

        if source_display != translated_display {
            diff.display_mismatch = Some(describe_display_mismatch(
                &source_display,
                &translated_display,
            ));
        }

        diff
    }

    /// Normalize a notation string for comparison
    fn normalize(&self, notation: &str) -> String {
        match self.mode {
            FormulaCompareMode::Strict => notation.to_string(),
            FormulaCompareMode::Lenient => notation.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

fn extraction_failure_diff(reason: &str) -> FormulaDiff {
    FormulaDiff {
        display_mismatch: Some(format!(
            "Formula extraction failed on translated text: {reason}"
        )),
        ..FormulaDiff::default()
    }
}

/// Human-readable description of an ordered display mismatch
fn describe_display_mismatch(source: &[String], translated: &[String]) -> String {
    let mut parts = vec![format!(
        "Display formulas mismatch: source has {}, translation has {}",
        source.len(),
        translated.len()
    )];
    for (i, (s, t)) in source.iter().zip(translated).enumerate() {
        if s != t {
            parts.push(format!("formula {} differs or is out of order", i + 1));
        }
    }
    parts.join("; ")
}
