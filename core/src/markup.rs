//! Host markup normalization.
//!
//! Leaf text is stored on the host wiki with explicit `<br>` line breaks.
//! `decode` turns host markup into buffer text; `encode` turns buffer text
//! back into host markup on save. The pair is deliberately lossy for
//! whitespace: `decode(encode(x)) == decode(x)` holds, but
//! `encode(decode(x)) == x` does not.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" *<br(?: */ *)?> *\n*").expect("valid line break pattern"));

static SPACE_BEFORE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid trailing space pattern"));

/// Host markup to buffer text.
pub fn decode(markup: &str) -> String {
    let text = LINE_BREAK.replace_all(markup, "\n");
    let text = SPACE_BEFORE_NEWLINE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Buffer text to host markup.
///
/// A newline between two non-empty lines becomes `<br>\n`; newlines next to
/// a blank line (paragraph separators) stay plain. Non-empty output ends
/// with exactly one newline. Line break tokens already present in `text`
/// are normalized first, so they come out the same way as typed newlines.
pub fn encode(text: &str) -> String {
    let text = decode(text);
    if text.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_end_matches([' ', '\t']))
        .collect();

    let mut out = String::with_capacity(text.len() + lines.len() * 4);
    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if let Some(next) = lines.get(i + 1) {
            if !line.is_empty() && !next.is_empty() {
                out.push_str("<br>");
            }
        }
        out.push('\n');
    }
    out
}
