//! Reply formatting (correction → Telegram HTML) and message splitting.

use std::fmt::Write as _;

use crate::{
    provider::CorrectionResult,
    reply::{Reply, ReplyKind},
};

/// Longest provider-supplied field we embed, in characters.
pub const MAX_FIELD_CHARS: usize = 500;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape untrusted text for embedding in a reply body.
///
/// On top of [`escape_html`], control characters other than newline and tab, and
/// invisible format characters (bidi overrides, zero-width marks), are rendered
/// as visible `\u{..}` sequences.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' | '\t' => out.push(c),
            c if c.is_control() || is_invisible_format(c) => {
                let _ = write!(out, "{}", c.escape_unicode());
            }
            c => out.push(c),
        }
    }
    out
}

/// Unicode Cf characters that can reorder or hide text.
fn is_invisible_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

/// Turn `\r\n` and lone `\r` line endings into `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Collapse all whitespace runs (including newlines) into single spaces.
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn field(text: &str) -> String {
    escape_text(&truncate_text(normalize_newlines(text).trim(), MAX_FIELD_CHARS))
}

fn line_field(text: &str) -> String {
    escape_text(&truncate_text(&one_line(text), MAX_FIELD_CHARS))
}

/// Render a provider result for `original` into a reply.
///
/// Pure: the same inputs always give a byte-identical body.
pub fn format_correction(
    original: &str,
    result: &CorrectionResult,
    max_examples: usize,
) -> Reply {
    if !result.has_changes {
        let mut body = String::from("✅ <b>Perfect Grammar!</b>\n");
        let sentence = line_field(&result.corrected_text);
        if !sentence.is_empty() {
            body.push_str(&format!("\n<code>{sentence}</code>\n"));
        }
        body.push_str("\n🌟 No grammar errors found!");
        return Reply::new(ReplyKind::AlreadyCorrect, body);
    }

    let mut sections = Vec::new();
    let original = line_field(original);
    if !original.is_empty() {
        sections.push(format!("✏️ <b>Original:</b>\n<code>{original}</code>"));
    }
    sections.push(format!(
        "✅ <b>Corrected:</b>\n<code>{}</code>",
        line_field(&result.corrected_text)
    ));

    let explanation = field(&result.explanation);
    if !explanation.is_empty() {
        sections.push(format!("💡 <b>Explanation:</b>\n{explanation}"));
    }

    let examples: Vec<String> = result
        .examples
        .iter()
        .take(max_examples)
        .map(|e| format!("• {}", line_field(e)))
        .collect();
    if !examples.is_empty() {
        sections.push(format!("📝 <b>Examples:</b>\n{}", examples.join("\n")));
    }

    Reply::new(ReplyKind::Corrected, sections.join("\n\n"))
}

/// Split an HTML body into chunks of at most `limit` bytes, on line boundaries.
///
/// Every line produced by this crate is self-contained HTML, so cutting between
/// lines never breaks a tag. A single line longer than `limit` becomes its own
/// chunk.
pub fn split_message(body: &str, limit: usize) -> Vec<String> {
    if body.len() <= limit {
        return vec![body.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();
    for line in body.split('\n') {
        let extra = if chunk.is_empty() { line.len() } else { line.len() + 1 };
        if !chunk.is_empty() && chunk.len() + extra > limit {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(line);
    }
    if !chunk.trim().is_empty() {
        out.push(chunk);
    }
    out.retain(|c| !c.trim().is_empty());
    out
}
