/*!
 * Formula-span extraction.
 *
 * This is the single extraction routine in the crate: the structural parser
 * uses it on source paragraphs and the validator re-uses it verbatim on
 * translated paragraphs. Any second implementation would drift and produce
 * false mismatches, so none exists.
 *
 * Extraction is a pure function of the paragraph text: display spans are
 * matched first (their interiors may contain `$`), the matched regions are
 * masked out, and inline spans are then paired up in the remainder.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::StructuralError;

use super::model::{FormulaKind, FormulaSpan};

/// Display-math patterns, tried in order. Each captures the notation interior.
static DISPLAY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let environments = ["equation", "align", "gather", "multline", "eqnarray"];
    let mut patterns = vec![
        (Regex::new(r"\$\$([^$]+)\$\$").unwrap(), "$$"),
        (Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap(), r"\["),
    ];
    for env in environments {
        let pattern = format!(r"(?s)\\begin\{{{env}\*?\}}(.*?)\\end\{{{env}\*?\}}", env = env);
        patterns.push((Regex::new(&pattern).unwrap(), env));
    }
    patterns
});

/// Detects a display environment opener left over after masking
static DANGLING_ENV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\begin\{(equation|align|gather|multline|eqnarray)\*?\}").unwrap()
});

/// Detects a `\[` opener left over after masking
static DANGLING_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\\[").unwrap());

/// Paragraph boundary: a blank (possibly whitespace-only) line
static PARAGRAPH_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Extract all formula spans from a piece of text, ordered by position.
///
/// Returns a structural error when delimiters do not pair up; translated
/// text that fails here is treated as a mismatch by the caller, never as
/// a fatal condition.
pub fn extract_formulas(text: &str) -> Result<Vec<FormulaSpan>, StructuralError> {
    let mut spans = Vec::new();
    let mut masked = text.as_bytes().to_vec();

    for (pattern, _) in DISPLAY_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let whole = captures.get(0).expect("match has a whole group");
            // A region already claimed by an earlier pattern is not re-counted
            if masked[whole.start()..whole.end()].iter().all(|b| *b == b' ') {
                continue;
            }
            let inner = captures
                .get(1)
                .expect("display pattern has a capture group");
            spans.push(FormulaSpan {
                kind: FormulaKind::Display,
                notation: inner.as_str().trim().to_string(),
                position: whole.start(),
            });
            for byte in &mut masked[whole.start()..whole.end()] {
                *byte = b' ';
            }
        }
    }

    // Masking preserves offsets, so positions below refer to the original text
    let remainder = String::from_utf8(masked).expect("masking keeps text valid UTF-8");

    if let Some(m) = DANGLING_ENV.captures(&remainder) {
        let whole = m.get(0).expect("match has a whole group");
        let (line, _) = line_and_column(text, whole.start());
        return Err(StructuralError::UnterminatedEnvironment {
            environment: m
                .get(1)
                .expect("environment name captured")
                .as_str()
                .to_string(),
            line,
        });
    }
    if let Some(m) = DANGLING_BRACKET.find(&remainder) {
        let (line, _) = line_and_column(text, m.start());
        return Err(StructuralError::UnterminatedEnvironment {
            environment: "\\[".to_string(),
            line,
        });
    }

    spans.extend(extract_inline(text, &remainder)?);
    spans.sort_by_key(|span| span.position);
    Ok(spans)
}

/// Pair up inline `$...$` delimiters in the masked remainder
fn extract_inline(original: &str, masked: &str) -> Result<Vec<FormulaSpan>, StructuralError> {
    let bytes = masked.as_bytes();
    let mut delimiters = Vec::new();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte == b'$' && (i == 0 || bytes[i - 1] != b'\\') {
            delimiters.push(i);
        }
    }

    if delimiters.len() % 2 != 0 {
        let position = *delimiters.last().expect("odd count implies at least one");
        let (line, column) = line_and_column(original, position);
        return Err(StructuralError::UnbalancedDelimiter { line, column });
    }

    let mut spans = Vec::with_capacity(delimiters.len() / 2);
    for pair in delimiters.chunks_exact(2) {
        let (open, close) = (pair[0], pair[1]);
        spans.push(FormulaSpan {
            kind: FormulaKind::Inline,
            notation: masked[open + 1..close].to_string(),
            position: open,
        });
    }
    Ok(spans)
}

/// Split text into paragraphs on blank-line boundaries.
///
/// Paragraphs are trimmed and empty ones dropped, matching the whitespace
/// normalization the rest of the pipeline expects.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// 1-based line and column of a byte offset
fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text[..offset.min(text.len())];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}
