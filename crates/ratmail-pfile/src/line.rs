use std::io::{Read, Seek, Write};
use std::ops::{Deref, DerefMut, Range};

use anyhow::Result;
use tracing::{debug, warn};

use crate::file::BackingStore;
use crate::markup::MarkupList;
use crate::style::{StyleHandle, StyleId};
use crate::width::str_width;
use crate::wrap::{Segment, WrapFlags, segment_range, wrap_text};

/// One logical line of the pager: counters, markup, lazy text and wrap rows.
#[derive(Debug, Clone, Default)]
pub struct PagedLine {
    pub(crate) offset: u64,
    pub(crate) num_bytes: usize,
    pub(crate) num_cols: usize,
    pub(crate) text: MarkupList,
    pub(crate) search: MarkupList,
    pub(crate) cached_text: Option<String>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) terminated: bool,
    /// Colour for the whole line, e.g. `StyleId::SIGNATURE`.
    pub default_style: StyleId,
    /// Resolved colour of the line, owned by the colour subsystem.
    pub line_style: Option<StyleHandle>,
    /// Default colour of the window the line is drawn in.
    pub merged_style: Option<StyleHandle>,
}

impl PagedLine {
    pub(crate) fn at_offset(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Position of the line's first byte in the backing store.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn text_spans(&self) -> &MarkupList {
        &self.text
    }

    pub fn search_spans(&self) -> &MarkupList {
        &self.search
    }

    pub fn has_matches(&self) -> bool {
        !self.search.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Rows this line occupies on screen.
    pub fn virtual_rows(&self) -> usize {
        self.segments.len().max(1)
    }

    pub fn is_cached(&self) -> bool {
        self.cached_text.is_some()
    }

    /// The memoised text, without touching the backing store.
    pub fn cached_text(&self) -> Option<&str> {
        self.cached_text.as_deref()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Byte range drawn on row `segment` of this line.
    pub fn segment_range(&self, segment: usize) -> Range<usize> {
        segment_range(&self.segments, segment, self.num_bytes)
    }

    /// Row of this line holding byte `byte`.
    pub fn segment_for_byte(&self, byte: usize) -> usize {
        self.segments
            .iter()
            .rposition(|seg| seg.offset_bytes <= byte)
            .unwrap_or(0)
    }

    /// Records a search match over `first..last`.
    pub fn add_search(&mut self, first: usize, last: usize) {
        let span = self.search.append_span();
        span.first = first;
        span.last = last;
        span.style = StyleId::SEARCH;
    }

    /// Drops markup, cached text and rows. The backing store is untouched.
    pub fn clear(&mut self) {
        self.text.clear();
        self.search.clear();
        self.cached_text = None;
        self.segments.clear();
    }

    fn record(&mut self, text: &str) -> usize {
        let cols = str_width(text);
        self.num_bytes += text.len();
        self.num_cols += cols;
        if let Some(cached) = self.cached_text.as_mut() {
            if !self.terminated {
                cached.push_str(text.split('\n').next().unwrap_or(""));
            }
        }
        if text.contains('\n') {
            self.terminated = true;
        }
        cols
    }

    /// Reads the line back from `store` unless it is already cached.
    pub(crate) fn ensure_cached<S: Read + Write + Seek>(
        &mut self,
        store: &mut BackingStore<S>,
        index: usize,
    ) -> bool {
        if self.cached_text.is_some() {
            return true;
        }
        match store.read_line_at(self.offset) {
            Ok(text) => {
                self.num_bytes = text.len();
                self.num_cols = str_width(&text);
                self.cached_text = Some(text);
                true
            }
            Err(err) => {
                warn!(line = index, offset = self.offset, "pager cache read failed: {err}");
                false
            }
        }
    }

    fn rewrap(&mut self, width: usize, flags: WrapFlags) {
        let Some(text) = self.cached_text.as_deref() else {
            return;
        };
        self.segments = wrap_text(text, width, flags);
    }
}

/// Mutable access to a line together with the store it lives in.
///
/// Everything that writes to or reads from the backing store goes through
/// here. Only the newest line accepts text.
pub struct LineMut<'a, S> {
    pub(crate) store: &'a mut BackingStore<S>,
    pub(crate) line: &'a mut PagedLine,
    pub(crate) index: usize,
    pub(crate) is_last: bool,
}

impl<S> Deref for LineMut<'_, S> {
    type Target = PagedLine;

    fn deref(&self) -> &PagedLine {
        self.line
    }
}

impl<S> DerefMut for LineMut<'_, S> {
    fn deref_mut(&mut self) -> &mut PagedLine {
        self.line
    }
}

impl<S: Read + Write + Seek> LineMut<'_, S> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Appends unstyled text. Returns the columns it occupies.
    pub fn add_text(&mut self, text: &str) -> Result<usize> {
        if !self.writable() {
            return Ok(0);
        }
        self.store.append(text)?;
        Ok(self.line.record(text))
    }

    /// Appends text drawn in colour `style`.
    pub fn add_colored_text(&mut self, style: StyleId, text: &str) -> Result<usize> {
        if !self.writable() {
            return Ok(0);
        }
        self.store.append(text)?;
        let first = self.line.num_bytes;
        let span = self.line.text.append_span();
        span.first = first;
        span.last = first + text.len();
        span.style = style;
        Ok(self.line.record(text))
    }

    /// Appends text coloured by pre-rendered escape sequences.
    pub fn add_ansi_text(
        &mut self,
        ansi_start: &str,
        ansi_end: &str,
        text: &str,
    ) -> Result<usize> {
        if !self.writable() {
            return Ok(0);
        }
        self.store.append(text)?;
        let first = self.line.num_bytes;
        let span = self.line.text.append_span();
        span.first = first;
        span.last = first + text.len();
        span.ansi_start = Some(ansi_start.to_string());
        span.ansi_end = (!ansi_end.is_empty()).then(|| ansi_end.to_string());
        Ok(self.line.record(text))
    }

    /// Terminates the line in the store. Counters are unchanged.
    pub fn add_newline(&mut self) -> Result<usize> {
        if !self.writable() {
            return Ok(0);
        }
        self.store.append("\n")?;
        self.line.terminated = true;
        Ok(0)
    }

    /// Reads the line back from the store, once.
    ///
    /// Returns false if the text could not be read.
    pub fn cache(&mut self) -> bool {
        self.line.ensure_cached(self.store, self.index)
    }

    pub fn get_text(&mut self) -> Option<&str> {
        if !self.cache() {
            return None;
        }
        self.line.cached_text.as_deref()
    }

    /// Text from the start of `segment` to the end of the line.
    pub fn get_virtual_text(&mut self, segment: Option<Segment>) -> Option<&str> {
        if !self.cache() {
            return None;
        }
        let text = self.line.cached_text.as_deref()?;
        match segment {
            Some(seg) => text.get(seg.offset_bytes..),
            None => Some(text),
        }
    }

    /// Recomputes the line's rows for `width` columns.
    pub fn wrap(&mut self, width: usize, flags: WrapFlags) {
        self.line.segments.clear();
        if self.line.num_cols <= width {
            return;
        }
        if !self.cache() {
            return;
        }
        self.line.rewrap(width, flags);
        debug!(
            line = self.index,
            cols = self.line.num_cols,
            width,
            segments = self.line.segments.len(),
            "pager wrap"
        );
    }

    fn writable(&self) -> bool {
        if !self.is_last || self.line.terminated {
            warn!(line = self.index, "pager write to a closed line ignored");
            return false;
        }
        true
    }
}
