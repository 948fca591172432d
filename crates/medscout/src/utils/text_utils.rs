//! Text helpers for queries and terminal output

use std::borrow::Cow;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

pub struct TextUtils;

impl TextUtils {
    /// Collapse runs of whitespace to one space and trim the ends
    pub fn normalize_whitespace(text: &str) -> Cow<'_, str> {
        if WHITESPACE_REGEX.is_match(text) {
            Cow::Owned(WHITESPACE_REGEX.replace_all(text, " ").trim().to_string())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// First `max_chars` characters. Counts chars, not bytes, so label
    /// text with non-ASCII symbols never splits inside a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
        match text.char_indices().nth(max_chars) {
            Some((byte_pos, _)) => Cow::Borrowed(&text[..byte_pos]),
            None => Cow::Borrowed(text),
        }
    }

    /// Label excerpt for display: at most `max_chars` characters, always
    /// followed by `...`
    pub fn preview(text: &str, max_chars: usize) -> String {
        format!("{}...", Self::truncate_chars(text, max_chars))
    }
}
