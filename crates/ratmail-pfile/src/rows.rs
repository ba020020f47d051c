//! Mapping between logical lines and on-screen ("virtual") rows.
//!
//! An unwrapped line is one row; a wrapped line is one row per segment.
//! Rewrapping lives on [`crate::PagedFile::wrap_all`] since it needs the store.

use serde::Serialize;

use crate::line::PagedLine;

/// A line and one of its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowPos {
    pub line: usize,
    pub segment: usize,
}

/// Result of looking up a virtual row.
///
/// Rows outside the file clamp to the first or last row instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLookup {
    Found(RowPos),
    Clamped(RowPos),
    /// There are no lines at all. Negative rows report this too, since there
    /// is no `(0, 0)` to clamp to.
    Empty,
}

impl RowLookup {
    pub fn pos(self) -> Option<RowPos> {
        match self {
            RowLookup::Found(pos) | RowLookup::Clamped(pos) => Some(pos),
            RowLookup::Empty => None,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, RowLookup::Found(_))
    }
}

pub fn count_virtual_rows(lines: &[PagedLine]) -> usize {
    lines.iter().map(PagedLine::virtual_rows).sum()
}

pub fn find_virtual_row(lines: &[PagedLine], virtual_row: isize) -> RowLookup {
    let Some(last) = lines.last() else {
        return RowLookup::Empty;
    };
    if virtual_row < 0 {
        return RowLookup::Clamped(RowPos { line: 0, segment: 0 });
    }

    let target = virtual_row as usize;
    let mut first_row = 0usize;
    for (line, pl) in lines.iter().enumerate() {
        let rows = pl.virtual_rows();
        if target < first_row + rows {
            return RowLookup::Found(RowPos {
                line,
                segment: target - first_row,
            });
        }
        first_row += rows;
    }

    RowLookup::Clamped(RowPos {
        line: lines.len() - 1,
        segment: last.virtual_rows() - 1,
    })
}

/// First virtual row of `segment` in `line`, if both exist.
pub fn virtual_row_of(lines: &[PagedLine], line: usize, segment: usize) -> Option<usize> {
    let pl = lines.get(line)?;
    if segment >= pl.virtual_rows() {
        return None;
    }
    let before: usize = lines[..line].iter().map(PagedLine::virtual_rows).sum();
    Some(before + segment)
}
