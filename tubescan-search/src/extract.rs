//! Carving JSON documents out of script-embedded page text.
//!
//! The platform inlines its state as a JavaScript assignment inside an
//! HTML page, with no declared length, so the only way to recover it is
//! to find a known anchor and scan forward until the brackets balance.

use crate::error::SearchError;

/// Text strictly between `left` and `right`, or `""` when either
/// delimiter is absent. Best-effort by design: credential and version
/// scraping must degrade to an empty string, never fail.
pub fn between<'a>(haystack: &'a str, left: &str, right: &str) -> &'a str {
    let Some(start) = haystack.find(left) else {
        return "";
    };
    let rest = &haystack[start + left.len()..];
    let Some(end) = rest.find(right) else {
        return "";
    };
    &rest[..end]
}

/// Shortest prefix of `raw` (after leading whitespace) that forms a
/// structurally balanced JSON array or object.
///
/// Tracks two booleans while scanning: whether the cursor is inside a
/// string literal, and whether the current character is escaped. An
/// unescaped quote toggles string mode; a backslash escapes exactly the
/// next character. Bracket depth only moves outside string mode, and
/// only for the bracket pair fixed by the first character.
pub fn cut_balanced(raw: &str) -> Result<&str, SearchError> {
    let trimmed = raw.trim_start();
    let offset = raw.len() - trimmed.len();
    let (open, close) = match trimmed.chars().next() {
        Some('[') => ('[', ']'),
        Some('{') => ('{', '}'),
        other => return Err(SearchError::UnsupportedRoot(other)),
    };

    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0i64;

    for (idx, ch) in trimmed.char_indices() {
        if ch == '"' && !escaped {
            in_string = !in_string;
        } else if !in_string {
            if ch == open {
                depth += 1;
            } else if ch == close {
                depth -= 1;
            }
        }
        escaped = ch == '\\' && !escaped;

        if depth == 0 {
            return Ok(&raw[offset..offset + idx + ch.len_utf8()]);
        }
    }
    Err(SearchError::UnterminatedStructure)
}

/// Locate `left` in `haystack`, cut the balanced JSON value that follows
/// it, and parse it. Any failure along the way yields `None`; the
/// decoder turns that into a "retry with a fresh response" signal.
pub fn json_after(haystack: &str, left: &str) -> Option<serde_json::Value> {
    let pos = haystack.find(left)?;
    let rest = &haystack[pos + left.len()..];
    let span = cut_balanced(rest).ok()?;
    serde_json::from_str(span).ok()
}
