//! Condensed document view construction.
//!
//! Full paper text is usually too long to send to an agent wholesale. The
//! view keeps the head of the document plus fixed-size windows around the
//! section keywords that carry extraction-relevant content.

use regex::Regex;
use std::sync::OnceLock;

/// Section keywords a window is cut around, in emission order.
const SECTION_KEYS: [&str; 9] = [
    "abstract",
    "introduction",
    "methods",
    "materials and methods",
    "results",
    "discussion",
    "conclusion",
    "table",
    "supplement",
];

const HEAD_CHARS: usize = 7_000;
const WINDOW_SPAN: usize = 12_000;
const WINDOW_LEAD: usize = 1_500;

/// Build the condensed view of a paper, capped at `max_chars` characters.
///
/// Whitespace is normalized first (trailing spaces before newlines removed,
/// runs of three or more newlines collapsed to two). The view is the first
/// 7000 characters followed by one labeled window per section keyword found,
/// each spanning 1500 characters before the match to 12000 after it.
#[must_use]
pub fn make_view(full_text: &str, max_chars: usize) -> String {
    static TRAILING_WS: OnceLock<Regex> = OnceLock::new();
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    let trailing = TRAILING_WS.get_or_init(|| Regex::new(r"[ \t]+\n").expect("valid regex"));
    let blanks = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = trailing.replace_all(full_text, "\n");
    let text = blanks.replace_all(&text, "\n\n");

    let mut chunks: Vec<String> = vec![slice_clamped(&text, 0, HEAD_CHARS).to_string()];
    for key in SECTION_KEYS {
        if let Some(idx) = find_ascii_ci(&text, key) {
            let start = idx.saturating_sub(WINDOW_LEAD);
            let window = slice_clamped(&text, start, WINDOW_LEAD + WINDOW_SPAN);
            chunks.push(format!(
                "\n\n===== {} (WINDOW) =====\n{}",
                key.to_uppercase(),
                window
            ));
        }
    }

    let combined = chunks.join("\n");
    slice_clamped(&combined, 0, max_chars).to_string()
}

/// ASCII-case-insensitive substring search returning a byte index.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let ndl = needle.as_bytes();
    if ndl.is_empty() || hay.len() < ndl.len() {
        return None;
    }
    hay.windows(ndl.len())
        .position(|window| window.eq_ignore_ascii_case(ndl))
}

/// Slice up to `len` bytes from byte `start`, clamped to char boundaries.
fn slice_clamped(text: &str, start: usize, len: usize) -> &str {
    let start = floor_boundary(text, start.min(text.len()));
    let end = floor_boundary(text, start.saturating_add(len).min(text.len()));
    &text[start..end]
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
