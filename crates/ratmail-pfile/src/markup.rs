use std::ops::Range;

use serde::Serialize;

use crate::style::StyleId;

/// A styled run, or a search match, over a line's bytes.
///
/// `last` is exclusive. Spans coloured by embedded escape sequences keep
/// `style == StyleId::NONE` and carry the raw sequences instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkupSpan {
    pub first: usize,
    pub last: usize,
    pub style: StyleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansi_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansi_end: Option<String>,
}

impl MarkupSpan {
    pub fn range(&self) -> Range<usize> {
        self.first..self.last
    }

    pub fn len(&self) -> usize {
        self.last.saturating_sub(self.first)
    }

    pub fn is_empty(&self) -> bool {
        self.last <= self.first
    }

    pub fn is_ansi(&self) -> bool {
        self.ansi_start.is_some()
    }

    pub fn overlaps(&self, range: Range<usize>) -> bool {
        self.first < range.end && range.start < self.last
    }
}

/// Append-only list of spans. Only whole-list clears are supported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MarkupList {
    spans: Vec<MarkupSpan>,
}

impl MarkupList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a zeroed span and hands it back for filling in.
    pub fn append_span(&mut self) -> &mut MarkupSpan {
        self.spans.push(MarkupSpan::default());
        let last = self.spans.len() - 1;
        &mut self.spans[last]
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn first(&self) -> Option<&MarkupSpan> {
        self.spans.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarkupSpan> {
        self.spans.iter()
    }

    pub fn as_slice(&self) -> &[MarkupSpan] {
        &self.spans
    }

    /// Spans touching `range`, in insertion order.
    pub fn overlapping(&self, range: Range<usize>) -> impl Iterator<Item = &MarkupSpan> {
        self.spans
            .iter()
            .filter(move |span| span.overlaps(range.clone()))
    }
}

impl<'a> IntoIterator for &'a MarkupList {
    type Item = &'a MarkupSpan;
    type IntoIter = std::slice::Iter<'a, MarkupSpan>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
