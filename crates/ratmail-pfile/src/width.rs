//! Terminal column widths.
//!
//! The terminal draws unprintable characters as a single `?`, so they count as
//! one column. Line terminators are not content and count as zero.

use unicode_width::UnicodeWidthChar as _;

pub fn char_width(ch: char) -> usize {
    if ch == '\n' {
        return 0;
    }
    if ch.is_control() {
        return 1;
    }
    ch.width().unwrap_or(0)
}

pub fn str_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Widest prefix of `text` that fits in `max_cols` columns.
///
/// Returns `(bytes, cols)`. Never splits a character; zero-width characters
/// that follow the last fitting character are kept with it.
pub fn truncate_to_width(text: &str, max_cols: usize) -> (usize, usize) {
    let mut bytes = 0usize;
    let mut cols = 0usize;
    for (idx, ch) in text.char_indices() {
        let w = char_width(ch);
        if cols + w > max_cols {
            return (idx, cols);
        }
        cols += w;
        bytes = idx + ch.len_utf8();
    }
    (bytes, cols)
}
