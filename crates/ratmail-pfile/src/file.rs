use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

use crate::line::{LineMut, PagedLine};
use crate::rows::{self, RowLookup};
use crate::wrap::WrapFlags;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one paged file, used to bind searches to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u64);

/// Index of a line within its paged file. Stays valid for the file's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(usize);

impl LineId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Append-only spill file with random access reads.
#[derive(Debug)]
pub(crate) struct BackingStore<S> {
    inner: S,
    write_pos: u64,
}

impl<S> BackingStore<S> {
    pub(crate) fn write_pos(&self) -> u64 {
        self.write_pos
    }

    fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write + Seek> BackingStore<S> {
    fn new(mut inner: S) -> io::Result<Self> {
        let write_pos = inner.stream_position()?;
        Ok(Self { inner, write_pos })
    }

    pub(crate) fn append(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.inner.seek(SeekFrom::Start(self.write_pos))?;
        self.inner.write_all(text.as_bytes())?;
        self.write_pos += text.len() as u64;
        Ok(())
    }

    /// Reads one physical line starting at `offset`, without its terminator.
    pub(crate) fn read_line_at(&mut self, offset: u64) -> io::Result<String> {
        if offset > self.write_pos {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("offset {} past end of store ({})", offset, self.write_pos),
            ));
        }
        self.inner.flush()?;
        self.inner.seek(SeekFrom::Start(offset))?;
        let limit = self.write_pos - offset;
        let mut reader = BufReader::new((&mut self.inner).take(limit));
        let mut buf = Vec::new();
        reader.read_until(b'\n', &mut buf)?;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(match String::from_utf8(buf) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }
}

/// The pager's backing store plus the lines written into it.
///
/// Lines record their start offset when created and are never moved in the
/// store, so it must only ever be appended to.
#[derive(Debug)]
pub struct PagedFile<S = File> {
    id: FileId,
    store: BackingStore<S>,
    owns_store: bool,
    lines: Vec<PagedLine>,
}

impl PagedFile<File> {
    /// Creates a paged file spilling to a private temporary file.
    pub fn new() -> Result<Self> {
        let file = tempfile::tempfile().context("Can't create temporary file")?;
        Self::build(file, true)
    }
}

impl<S> PagedFile<S> {
    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn owns_store(&self) -> bool {
        self.owns_store
    }

    /// Current end of the store, where the next line will start.
    pub fn write_offset(&self) -> u64 {
        self.store.write_pos()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[PagedLine] {
        &self.lines
    }

    pub fn line(&self, id: LineId) -> Option<&PagedLine> {
        self.lines.get(id.0)
    }

    pub fn count_virtual_rows(&self) -> usize {
        rows::count_virtual_rows(&self.lines)
    }

    pub fn find_virtual_row(&self, virtual_row: isize) -> RowLookup {
        rows::find_virtual_row(&self.lines, virtual_row)
    }

    /// Releases every line's markup, cache and rows. Text stays in the store.
    pub fn clear_lines(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    /// Drops every line's search matches.
    pub fn clear_search(&mut self) {
        for line in &mut self.lines {
            line.search.clear();
        }
    }

    /// Closes the file and hands the store back to the caller.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

impl<S: Read + Write + Seek> PagedFile<S> {
    /// Uses a caller-supplied store. Writing starts at its current position;
    /// get it back with [`PagedFile::into_store`].
    pub fn with_store(store: S) -> Result<Self> {
        Self::build(store, false)
    }

    fn build(store: S, owns_store: bool) -> Result<Self> {
        let store = BackingStore::new(store).context("Can't open pager store")?;
        let id = FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed));
        debug!(file = id.0, owns_store, "pager file created");
        Ok(Self {
            id,
            store,
            owns_store,
            lines: Vec::new(),
        })
    }

    /// Starts a new line at the write position.
    ///
    /// An unterminated previous line gets its newline first.
    pub fn new_line(&mut self) -> Result<LineId> {
        if let Some(last) = self.lines.last_mut() {
            if !last.terminated {
                self.store.append("\n")?;
                last.terminated = true;
            }
        }
        self.lines.push(PagedLine::at_offset(self.store.write_pos()));
        Ok(LineId(self.lines.len() - 1))
    }

    /// Starts a new line and returns it ready for writing.
    pub fn push_line(&mut self) -> Result<LineMut<'_, S>> {
        let id = self.new_line()?;
        self.line_mut(id).context("Line vanished after creation")
    }

    pub fn line_mut(&mut self, id: LineId) -> Option<LineMut<'_, S>> {
        self.line_at_mut(id.0)
    }

    pub fn line_at_mut(&mut self, index: usize) -> Option<LineMut<'_, S>> {
        let is_last = index + 1 == self.lines.len();
        let line = self.lines.get_mut(index)?;
        Some(LineMut {
            store: &mut self.store,
            line,
            index,
            is_last,
        })
    }

    pub fn last_line_mut(&mut self) -> Option<LineMut<'_, S>> {
        let index = self.lines.len().checked_sub(1)?;
        self.line_at_mut(index)
    }

    /// Cached text of line `index`, reading it from the store if needed.
    pub fn text(&mut self, index: usize) -> Option<&str> {
        let line = self.lines.get_mut(index)?;
        if !line.ensure_cached(&mut self.store, index) {
            return None;
        }
        line.cached_text()
    }

    /// Rewraps every line, e.g. after the viewport changed width.
    pub fn wrap_all(&mut self, width: usize, flags: WrapFlags) {
        let count = self.lines.len();
        for index in 0..count {
            if let Some(mut line) = self.line_at_mut(index) {
                line.wrap(width, flags);
            }
        }
        debug!(
            file = self.id.0,
            width,
            rows = rows::count_virtual_rows(&self.lines),
            "pager wrap all"
        );
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut BackingStore<S>, &mut [PagedLine]) {
        (&mut self.store, &mut self.lines)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};

    use super::PagedFile;
    use crate::style::StyleId;
    use crate::wrap::WrapFlags;

    #[test]
    fn store_layout_is_lines_joined_by_newlines() -> anyhow::Result<()> {
        let mut pf = PagedFile::with_store(Cursor::new(Vec::new()))?;
        pf.push_line()?.add_text("From: someone")?;
        let mut line = pf.push_line()?;
        line.add_colored_text(StyleId::QUOTED, "> hi")?;
        line.add_newline()?;
        pf.push_line()?.add_text("bye")?;
        let store = pf.into_store();
        assert_eq!(store.into_inner(), b"From: someone\n> hi\nbye".to_vec());
        Ok(())
    }

    #[test]
    fn line_offsets_are_monotonic_write_positions() -> anyhow::Result<()> {
        let mut pf = PagedFile::new()?;
        for text in ["alpha", "", "gamma delta"] {
            pf.push_line()?.add_text(text)?;
        }
        let offsets: Vec<u64> = pf.lines().iter().map(|l| l.offset()).collect();
        assert_eq!(offsets, vec![0, 6, 7]);
        assert_eq!(pf.text(2), Some("gamma delta"));
        assert_eq!(pf.text(1), Some(""));
        assert_eq!(pf.text(0), Some("alpha"));
        assert_eq!(pf.text(3), None);
        Ok(())
    }

    #[test]
    fn reads_do_not_disturb_later_writes() -> anyhow::Result<()> {
        let mut pf = PagedFile::new()?;
        pf.push_line()?.add_text("first")?;
        let mut second = pf.push_line()?;
        second.add_text("sec")?;
        assert_eq!(pf.text(0), Some("first"));
        pf.last_line_mut()
            .ok_or_else(|| anyhow::anyhow!("missing line"))?
            .add_text("ond")?;
        pf.clear_lines();
        assert_eq!(pf.text(1), Some("second"));
        Ok(())
    }

    #[test]
    fn external_handle_starts_at_its_position_and_is_returned() -> anyhow::Result<()> {
        let mut file = tempfile::tempfile()?;
        file.write_all(b"preamble\n")?;
        let mut pf = PagedFile::with_store(&mut file)?;
        assert!(!pf.owns_store());
        assert_eq!(pf.write_offset(), 9);
        pf.push_line()?.add_text("body")?;
        assert_eq!(pf.lines()[0].offset(), 9);
        assert_eq!(pf.text(0), Some("body"));
        drop(pf);

        let mut contents = String::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_string(&mut contents)?;
        assert_eq!(contents, "preamble\nbody");
        Ok(())
    }

    #[test]
    fn files_get_distinct_ids() -> anyhow::Result<()> {
        let a = PagedFile::new()?;
        let b = PagedFile::new()?;
        assert_ne!(a.id(), b.id());
        assert!(a.owns_store());
        Ok(())
    }

    #[test]
    fn wrap_all_and_row_lookup_agree() -> anyhow::Result<()> {
        let mut pf = PagedFile::new()?;
        pf.push_line()?.add_text("short")?;
        pf.push_line()?.add_text("a line that needs wrapping")?;
        pf.push_line()?.add_text("end")?;
        pf.wrap_all(10, WrapFlags::empty());
        assert_eq!(pf.count_virtual_rows(), 5);
        let pos = pf
            .find_virtual_row(4)
            .pos()
            .ok_or_else(|| anyhow::anyhow!("no row"))?;
        assert_eq!((pos.line, pos.segment), (2, 0));
        Ok(())
    }
}
