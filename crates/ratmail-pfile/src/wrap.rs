use std::ops::Range;

use bitflags::bitflags;
use serde::Serialize;

use crate::width::{char_width, str_width, truncate_to_width};

bitflags! {
    /// Flags controlling how a line is broken into rows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WrapFlags: u8 {
        /// A continuation marker is drawn at the start of each wrapped row.
        const MARKERS = 1 << 0;
        /// The viewport wraps long lines instead of truncating them.
        const WRAP = 1 << 1;
        /// Prefer breaking rows at word boundaries.
        const SMART_WRAP = 1 << 2;
    }
}

/// Start of one on-screen row of a wrapped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Segment {
    pub offset_bytes: usize,
    pub offset_cols: usize,
}

/// Breaks `text` into rows of at most `width` columns.
///
/// Text that fits yields no segments: an unwrapped line is one row. With
/// `MARKERS`, rows after the first lose a column to the continuation marker.
/// Segments cover the text disjointly and never split a character.
pub fn wrap_text(text: &str, width: usize, flags: WrapFlags) -> Vec<Segment> {
    let mut segments = Vec::new();
    if str_width(text) <= width {
        return segments;
    }

    let mut avail = width.max(1);
    let mut total_bytes = 0usize;
    let mut total_cols = 0usize;

    while total_bytes < text.len() {
        segments.push(Segment {
            offset_bytes: total_bytes,
            offset_cols: total_cols,
        });

        let rest = &text[total_bytes..];
        let (mut bytes, mut cols) = truncate_to_width(rest, avail);
        if bytes == 0 {
            (bytes, cols) = oversized_char(rest);
        } else if flags.contains(WrapFlags::SMART_WRAP) && bytes < rest.len() {
            if let Some(cut) = word_break(rest, bytes) {
                bytes = cut;
                cols = str_width(&rest[..cut]);
            }
        }

        if segments.len() == 1 && flags.contains(WrapFlags::MARKERS) {
            avail = avail.saturating_sub(1).max(1);
        }

        total_bytes += bytes;
        total_cols += cols;
    }

    segments
}

/// Byte range of segment `idx` within a line of `num_bytes` bytes.
pub fn segment_range(segments: &[Segment], idx: usize, num_bytes: usize) -> Range<usize> {
    if segments.is_empty() {
        return 0..num_bytes;
    }
    let Some(seg) = segments.get(idx) else {
        return num_bytes..num_bytes;
    };
    let end = segments
        .get(idx + 1)
        .map(|next| next.offset_bytes)
        .unwrap_or(num_bytes);
    seg.offset_bytes..end
}

// A character wider than the row still has to go somewhere.
fn oversized_char(rest: &str) -> (usize, usize) {
    let mut chars = rest.char_indices();
    let Some((_, first)) = chars.next() else {
        return (0, 0);
    };
    let mut bytes = first.len_utf8();
    let cols = char_width(first);
    for (idx, ch) in chars {
        if char_width(ch) != 0 {
            break;
        }
        bytes = idx + ch.len_utf8();
    }
    (bytes, cols)
}

fn word_break(rest: &str, cut: usize) -> Option<usize> {
    let next_is_space = rest[cut..]
        .chars()
        .next()
        .map(char::is_whitespace)
        .unwrap_or(true);
    if next_is_space {
        return None;
    }
    let (idx, ch) = rest[..cut]
        .char_indices()
        .rev()
        .find(|(_, ch)| ch.is_whitespace())?;
    let after = idx + ch.len_utf8();
    (after < cut).then_some(after)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Segment, WrapFlags, segment_range, wrap_text};
    use crate::width::str_width;

    fn row_widths(text: &str, segments: &[Segment]) -> Vec<usize> {
        (0..segments.len())
            .map(|idx| str_width(&text[segment_range(segments, idx, text.len())]))
            .collect()
    }

    #[test]
    fn fitting_line_has_no_segments() {
        assert!(wrap_text("", 10, WrapFlags::empty()).is_empty());
        assert!(wrap_text("0123456789", 10, WrapFlags::empty()).is_empty());
        assert_eq!(wrap_text("0123456789A", 10, WrapFlags::empty()).len(), 2);
    }

    #[test]
    fn plain_wrap_uses_full_width() {
        let text = "AAAbbbCCCdddEEEfffGGG";
        let segments = wrap_text(text, 10, WrapFlags::empty());
        assert_eq!(
            segments,
            vec![
                Segment { offset_bytes: 0, offset_cols: 0 },
                Segment { offset_bytes: 10, offset_cols: 10 },
                Segment { offset_bytes: 20, offset_cols: 20 },
            ]
        );
    }

    #[test]
    fn markers_reserve_a_column_on_continuation_rows() {
        let text = "AAAbbbCCCdddEEEfffGGG";
        let segments = wrap_text(text, 10, WrapFlags::MARKERS);
        assert_eq!(row_widths(text, &segments), vec![10, 9, 2]);
    }

    #[test]
    fn wide_chars_are_never_split() {
        let text = "ab日本語cd";
        let segments = wrap_text(text, 3, WrapFlags::empty());
        assert_eq!(row_widths(text, &segments), vec![2, 2, 2, 3, 1]);
        for seg in &segments {
            assert!(text.is_char_boundary(seg.offset_bytes));
        }
    }

    #[test]
    fn char_wider_than_row_takes_a_row_of_its_own() {
        let segments = wrap_text("日日", 1, WrapFlags::empty());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].offset_bytes, 3);
        assert_eq!(segments[1].offset_cols, 2);
    }

    #[test]
    fn smart_wrap_breaks_after_whitespace() {
        let text = "the quick brown fox";
        let segments = wrap_text(text, 12, WrapFlags::SMART_WRAP);
        let rows: Vec<&str> = (0..segments.len())
            .map(|idx| &text[segment_range(&segments, idx, text.len())])
            .collect();
        assert_eq!(rows, vec!["the quick ", "brown fox"]);
    }

    #[test]
    fn smart_wrap_falls_back_to_hard_break_for_long_words() {
        let text = "abcdefghijklmnop";
        let hard = wrap_text(text, 5, WrapFlags::empty());
        let smart = wrap_text(text, 5, WrapFlags::SMART_WRAP);
        assert_eq!(hard, smart);
    }

    #[test]
    fn wrapping_is_idempotent() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit";
        let flags = WrapFlags::MARKERS | WrapFlags::SMART_WRAP;
        assert_eq!(wrap_text(text, 13, flags), wrap_text(text, 13, flags));
    }

    #[test]
    fn segment_range_handles_unwrapped_and_out_of_range() {
        assert_eq!(segment_range(&[], 0, 7), 0..7);
        let segments = wrap_text("0123456789ABC", 5, WrapFlags::empty());
        assert_eq!(segment_range(&segments, 2, 13), 10..13);
        assert_eq!(segment_range(&segments, 9, 13), 13..13);
    }

    proptest! {
        #[test]
        fn segments_cover_line_within_width(
            text in "[a-z 日é\u{301}]{0,60}",
            width in 2usize..30,
            smart in any::<bool>(),
        ) {
            let flags = if smart { WrapFlags::SMART_WRAP } else { WrapFlags::empty() };
            let segments = wrap_text(&text, width, flags);
            if str_width(&text) <= width {
                prop_assert!(segments.is_empty());
            } else {
                prop_assert_eq!(segments[0].offset_bytes, 0);
                let mut covered = 0usize;
                for idx in 0..segments.len() {
                    let range = segment_range(&segments, idx, text.len());
                    prop_assert_eq!(range.start, covered);
                    prop_assert!(range.end > range.start);
                    prop_assert!(text.is_char_boundary(range.start));
                    prop_assert!(str_width(&text[range.clone()]) <= width);
                    prop_assert_eq!(segments[idx].offset_cols, str_width(&text[..range.start]));
                    covered = range.end;
                }
                prop_assert_eq!(covered, text.len());
            }
            prop_assert_eq!(wrap_text(&text, width, flags), segments);
        }

        #[test]
        fn marker_rows_fit_the_reduced_width(text in "[a-z ]{0,80}", width in 2usize..30) {
            let segments = wrap_text(&text, width, WrapFlags::MARKERS);
            for idx in 1..segments.len() {
                let range = segment_range(&segments, idx, text.len());
                prop_assert!(str_width(&text[range]) <= width - 1);
            }
        }
    }
}
