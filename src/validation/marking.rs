/*!
 * Visible marking of paragraphs whose mismatches survived all retries.
 *
 * The marking wraps the translated paragraph in a color span and appends a
 * footnote describing the diff, so a reviewer can find every unresolved
 * spot by searching the output for the color command.
 */

use crate::document::FormulaDiff;

/// Wrap a translated paragraph in a visible marking with a diff footnote
pub fn mark_paragraph(paragraph: &str, diff: &FormulaDiff, color: &str) -> String {
    format!(
        "{{\\color{{{color}}} {paragraph}\\footnote{{{note}}}}}",
        note = escape_footnote(&diff.summary()),
    )
}

/// Escape characters that break inside `\footnote{...}`
fn escape_footnote(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '_' => escaped.push_str("\\_"),
            '$' => escaped.push_str("\\$"),
            '%' => escaped.push_str("\\%"),
            '&' => escaped.push_str("\\&"),
            '#' => escaped.push_str("\\#"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
