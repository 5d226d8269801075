/*!
 * Result assembly: the translated document text and the structured run
 * outcome.
 *
 * The translated document is a new artifact built from the immutable parsed
 * source plus the accumulated translation state. Failed sections carry their
 * source text through so the output always compiles to a complete document.
 */

use crate::document::{Document, RunOutcome, RunStatus, Section, SectionStatus};
use crate::terminology::Dictionary;
use crate::translation::TranslationState;

/// Rebuild the full document text from the translation state.
///
/// Section headings keep their source titles; heading commands are re-emitted
/// per section level. The document environment is re-emitted exactly when the
/// source carried one, even with an empty preamble.
pub fn assemble_document(document: &Document, state: &TranslationState) -> String {
    let mut output = String::new();

    if document.has_envelope {
        if !document.preamble.trim().is_empty() {
            output.push_str(document.preamble.trim_end());
            output.push_str("\n\n");
        }
        output.push_str("\\begin{document}\n\n");
    }

    for section in &document.sections {
        if let Some(command) = section.heading_command() {
            output.push_str(&format!("\\{command}{{{title}}}\n\n", title = section.title));
        }
        output.push_str(section_text(section, state).trim());
        output.push_str("\n\n");
    }

    if document.has_envelope {
        output.push_str("\\end{document}\n");
        output.push_str(document.postamble.trim_start());
    }

    let mut output = output.trim_end().to_string();
    output.push('\n');
    output
}

/// Final text for one section: its translation, or the source text when the
/// section failed
fn section_text<'a>(section: &'a Section, state: &'a TranslationState) -> &'a str {
    match state.result(&section.id) {
        Some(result) if result.status != SectionStatus::Failed => &result.text,
        _ => &section.content,
    }
}

/// Build the structured outcome consumed by the external report renderer
pub fn build_outcome(
    document: &Document,
    state: &TranslationState,
    run_id: &str,
    source_hash: &str,
    dictionary: &Dictionary,
    elapsed_secs: f64,
) -> RunOutcome {
    let sections: Vec<(String, SectionStatus)> = document
        .sections
        .iter()
        .map(|section| {
            let status = state
                .result(&section.id)
                .map(|r| r.status.clone())
                .unwrap_or(SectionStatus::Failed);
            (section.id.clone(), status)
        })
        .collect();

    let marked_paragraphs = state.marked_paragraphs();
    let failed_sections = state.failed_sections();

    let status = if marked_paragraphs.is_empty() && failed_sections.is_empty() {
        RunStatus::Success
    } else {
        RunStatus::CompletedWithMarkings
    };

    RunOutcome {
        status,
        run_id: run_id.to_string(),
        source_hash: source_hash.to_string(),
        sections,
        marked_paragraphs,
        failed_sections,
        dictionary: dictionary
            .iter()
            .map(|(s, t)| (s.clone(), t.clone()))
            .collect(),
        elapsed_secs,
    }
}
