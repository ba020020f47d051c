use std::io::{Read, Seek, Write};
use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::file::{FileId, PagedFile};
use crate::line::PagedLine;
use crate::rows::virtual_row_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search is not attached to these lines")]
    Unbound,
    #[error("no search pattern")]
    NoPattern,
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Outcome of indexing a file for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchSummary {
    pub matches: usize,
    pub lines: usize,
    /// The match cap was hit; later lines were not scanned.
    pub truncated: bool,
    /// First matching line at or after the start line, in the search direction.
    pub first: Option<SearchHit>,
}

/// A line holding matches, and where its first match is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub line: usize,
    pub segment: usize,
    pub virtual_row: usize,
}

/// Regex search over the lines of one paged file.
///
/// The search is bound to a file by id, never by reference; using it with any
/// other file is refused.
#[derive(Debug)]
pub struct SimplePagerSearch {
    pattern: Option<String>,
    regex: Option<Regex>,
    direction: SearchDirection,
    show_search: bool,
    bound: Option<FileId>,
    match_limit: Option<usize>,
}

impl Default for SimplePagerSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplePagerSearch {
    pub fn new() -> Self {
        Self {
            pattern: None,
            regex: None,
            direction: SearchDirection::Forward,
            show_search: true,
            bound: None,
            match_limit: None,
        }
    }

    /// Stops indexing once `limit` matches have been recorded.
    pub fn with_match_limit(mut self, limit: usize) -> Self {
        self.match_limit = (limit > 0).then_some(limit);
        self
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn is_compiled(&self) -> bool {
        self.regex.is_some()
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    pub fn show_search(&self) -> bool {
        self.show_search
    }

    pub fn set_show_search(&mut self, show: bool) {
        self.show_search = show;
    }

    pub fn toggle_show_search(&mut self) -> bool {
        self.show_search = !self.show_search;
        self.show_search
    }

    pub fn is_bound_to<S>(&self, file: &PagedFile<S>) -> bool {
        self.bound == Some(file.id())
    }

    /// Forgets the pattern and detaches from any file.
    pub fn clear(&mut self) {
        self.pattern = None;
        self.regex = None;
        self.direction = SearchDirection::Forward;
        self.bound = None;
    }

    /// Attaches to `file`, or detaches with `None`.
    ///
    /// Switching files drops the pattern; old matches are replaced by the
    /// next search.
    pub fn set_lines<S>(&mut self, file: Option<&PagedFile<S>>) {
        let id = file.map(PagedFile::id);
        if self.bound == id {
            return;
        }
        self.clear();
        self.bound = id;
    }

    /// Compiles `pattern` and records every match in every line.
    ///
    /// Matching ignores case unless the pattern has an uppercase letter.
    /// `start_index` and `direction` only decide which hit is reported first.
    pub fn search<S: Read + Write + Seek>(
        &mut self,
        file: &mut PagedFile<S>,
        pattern: &str,
        start_index: usize,
        direction: SearchDirection,
    ) -> Result<SearchSummary, SearchError> {
        if !self.is_bound_to(file) {
            return Err(SearchError::Unbound);
        }
        if pattern.is_empty() {
            return Err(SearchError::NoPattern);
        }

        self.pattern = None;
        self.regex = None;
        file.clear_search();

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!pattern.chars().any(char::is_uppercase))
            .multi_line(true)
            .build()
            .map_err(|err| SearchError::InvalidPattern {
                pattern: pattern.to_string(),
                message: err.to_string(),
            })?;

        let mut summary = SearchSummary::default();
        let (store, lines) = file.parts_mut();
        for (index, line) in lines.iter_mut().enumerate() {
            if !line.ensure_cached(store, index) {
                continue;
            }
            let remaining = self
                .match_limit
                .map(|limit| limit.saturating_sub(summary.matches));
            if remaining == Some(0) {
                summary.truncated = true;
                break;
            }
            let found = find_matches(&regex, line.cached_text().unwrap_or(""), remaining);
            if found.is_empty() {
                continue;
            }
            debug!(pattern, line = index, matches = found.len(), "pager search matches");
            summary.matches += found.len();
            summary.lines += 1;
            for range in found {
                line.add_search(range.start, range.end);
            }
        }
        if let Some(limit) = self.match_limit {
            summary.truncated |= summary.matches >= limit;
        }

        self.pattern = Some(pattern.to_string());
        self.regex = Some(regex);
        self.direction = direction;

        let lines = file.lines();
        summary.first = first_with_matches(lines, inclusive_order(lines.len(), start_index, direction))
            .map(|line| hit_for(lines, line));
        Ok(summary)
    }

    /// Next line with matches after (or before) `start_row`, wrapping around
    /// the ends of the file. The start line itself is never returned.
    pub fn next<S>(
        &self,
        file: &PagedFile<S>,
        start_row: usize,
        direction: SearchDirection,
    ) -> Result<Option<SearchHit>, SearchError> {
        if !self.is_bound_to(file) {
            return Err(SearchError::Unbound);
        }
        if self.regex.is_none() {
            return Err(SearchError::NoPattern);
        }
        let lines = file.lines();
        let found = first_with_matches(lines, exclusive_order(lines.len(), start_row, direction));
        Ok(found.map(|line| hit_for(lines, line)))
    }

    /// Repeats the last search's direction, or its opposite.
    pub fn next_again<S>(
        &self,
        file: &PagedFile<S>,
        start_row: usize,
        opposite: bool,
    ) -> Result<Option<SearchHit>, SearchError> {
        let direction = if opposite {
            self.direction.reversed()
        } else {
            self.direction
        };
        self.next(file, start_row, direction)
    }
}

fn find_matches(regex: &Regex, text: &str, limit: Option<usize>) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut offset = 0usize;
    while let Some(m) = regex.find_at(text, offset) {
        found.push(m.range());
        if limit.is_some_and(|limit| found.len() >= limit) {
            break;
        }
        offset = if m.is_empty() {
            match text[m.end()..].chars().next() {
                Some(ch) => m.end() + ch.len_utf8(),
                None => break,
            }
        } else {
            m.end()
        };
        if offset >= text.len() {
            break;
        }
    }
    found
}

fn exclusive_order(
    len: usize,
    start: usize,
    direction: SearchDirection,
) -> Box<dyn Iterator<Item = usize>> {
    let before = start.min(len);
    let after = start.saturating_add(1).min(len);
    match direction {
        SearchDirection::Forward => Box::new((after..len).chain(0..before)),
        SearchDirection::Backward => Box::new((0..before).rev().chain((after..len).rev())),
    }
}

fn inclusive_order(
    len: usize,
    start: usize,
    direction: SearchDirection,
) -> Box<dyn Iterator<Item = usize>> {
    let start = start.min(len.saturating_sub(1));
    match direction {
        SearchDirection::Forward => Box::new((start..len).chain(0..start)),
        SearchDirection::Backward => {
            let after = (start + 1).min(len);
            Box::new((0..after).rev().chain((after..len).rev()))
        }
    }
}

fn first_with_matches(lines: &[PagedLine], mut order: impl Iterator<Item = usize>) -> Option<usize> {
    order.find(|&idx| lines.get(idx).is_some_and(PagedLine::has_matches))
}

fn hit_for(lines: &[PagedLine], line: usize) -> SearchHit {
    let segment = lines[line]
        .search_spans()
        .first()
        .map(|span| lines[line].segment_for_byte(span.first))
        .unwrap_or(0);
    SearchHit {
        line,
        segment,
        virtual_row: virtual_row_of(lines, line, segment).unwrap_or(0),
    }
}
