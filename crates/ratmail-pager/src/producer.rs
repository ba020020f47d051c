use std::io::{BufRead, Read, Seek, Write};

use anyhow::Result;
use ratmail_pfile::{LineMut, PagedFile, StyleId, char_width};
use tracing::debug;

use crate::ansi::{SGR_RESET, split_sgr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Headers,
    Body,
    Signature,
}

/// Turns a plain message into styled pager lines.
#[derive(Debug)]
pub(crate) struct MessageProducer {
    tab_width: usize,
    section: Section,
}

impl MessageProducer {
    pub(crate) fn new(tab_width: usize) -> Self {
        Self {
            tab_width: tab_width.max(1),
            section: Section::Headers,
        }
    }

    pub(crate) fn read_all<S, R>(&mut self, file: &mut PagedFile<S>, mut reader: R) -> Result<()>
    where
        S: Read + Write + Seek,
        R: BufRead,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let terminated = buf.last() == Some(&b'\n');
            let raw = String::from_utf8_lossy(&buf);
            let line = raw.trim_end_matches(['\n', '\r']);
            self.add_line(file, line, terminated)?;
        }
        debug!(lines = file.len(), "message produced");
        Ok(())
    }

    pub(crate) fn add_line<S: Read + Write + Seek>(
        &mut self,
        file: &mut PagedFile<S>,
        raw: &str,
        terminated: bool,
    ) -> Result<()> {
        let chunks = split_sgr(raw);
        let visible: String = chunks.iter().map(|c| c.text.as_str()).collect();
        let style = self.classify(&visible);

        let mut line = file.push_line()?;
        let mut writer = ChunkWriter {
            tab_width: self.tab_width,
            col: 0,
        };
        match style {
            LineStyle::Plain => {
                for chunk in &chunks {
                    writer.write(&mut line, StyleId::NONE, &chunk.sgr, &chunk.text)?;
                }
            }
            LineStyle::Whole(id) => {
                line.default_style = id;
                for chunk in &chunks {
                    writer.write(&mut line, id, &chunk.sgr, &chunk.text)?;
                }
            }
            LineStyle::Header { name_len } => {
                let (name, value) = visible.split_at(name_len);
                writer.write(&mut line, StyleId::HEADER, "", name)?;
                writer.write(&mut line, StyleId::NONE, "", value)?;
            }
            LineStyle::Line(id) => {
                line.default_style = id;
                for chunk in &chunks {
                    writer.write(&mut line, StyleId::NONE, &chunk.sgr, &chunk.text)?;
                }
            }
        }
        if terminated {
            line.add_newline()?;
        }
        Ok(())
    }

    fn classify(&mut self, visible: &str) -> LineStyle {
        if self.section == Section::Headers {
            if visible.trim().is_empty() {
                self.section = Section::Body;
                return LineStyle::Plain;
            }
            if let Some(name_len) = header_name_len(visible) {
                return LineStyle::Header { name_len };
            }
            if visible.starts_with([' ', '\t']) {
                return LineStyle::Plain;
            }
            self.section = Section::Body;
        }
        if visible == "-- " {
            self.section = Section::Signature;
        }
        match self.section {
            Section::Signature => LineStyle::Line(StyleId::SIGNATURE),
            _ if visible.starts_with('>') => LineStyle::Whole(StyleId::QUOTED),
            _ => LineStyle::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LineStyle {
    Plain,
    Whole(StyleId),
    Header { name_len: usize },
    Line(StyleId),
}

// `Name:` up to and including the colon.
fn header_name_len(line: &str) -> Option<usize> {
    let colon = line.find(':')?;
    let name = &line[..colon];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && c != ':');
    valid.then_some(colon + 1)
}

struct ChunkWriter {
    tab_width: usize,
    col: usize,
}

impl ChunkWriter {
    fn write<S: Read + Write + Seek>(
        &mut self,
        line: &mut LineMut<'_, S>,
        style: StyleId,
        sgr: &str,
        text: &str,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let text = self.expand_tabs(text);
        if !sgr.is_empty() {
            line.add_ansi_text(sgr, SGR_RESET, &text)?;
        } else if style.is_none() {
            line.add_text(&text)?;
        } else {
            line.add_colored_text(style, &text)?;
        }
        Ok(())
    }

    fn expand_tabs(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\t' {
                let pad = self.tab_width - self.col % self.tab_width;
                out.extend(std::iter::repeat_n(' ', pad));
                self.col += pad;
            } else {
                out.push(ch);
                self.col += char_width(ch);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ratatui::style::{Color, Modifier};
    use ratmail_pfile::{PagedFile, StyleId, WrapFlags};

    use super::MessageProducer;
    use crate::config::PagerColors;
    use crate::view::{ViewOptions, render_rows};

    const MESSAGE: &str = "From: alice@example.com\nSubject: hi\n\tthere\n\nHello\tBob\n> quoted: no header\n\x1b[1mbold\x1b[0m done\n-- \nAlice\n";

    fn produce(text: &str) -> anyhow::Result<PagedFile> {
        let mut pf = PagedFile::new()?;
        MessageProducer::new(8).read_all(&mut pf, Cursor::new(text.as_bytes()))?;
        Ok(pf)
    }

    #[test]
    fn lines_are_split_and_tabs_expanded() -> anyhow::Result<()> {
        let mut pf = produce(MESSAGE)?;
        assert_eq!(pf.len(), 9);
        assert_eq!(pf.text(4), Some("Hello   Bob"));
        assert_eq!(pf.text(2), Some("        there"));
        assert!(pf.lines().iter().all(|line| line.is_terminated()));
        Ok(())
    }

    #[test]
    fn headers_quotes_and_signature_get_styles() -> anyhow::Result<()> {
        let pf = produce(MESSAGE)?;
        let lines = pf.lines();
        let from = lines[0].text_spans().as_slice();
        assert_eq!(from.len(), 1);
        assert_eq!((from[0].style, from[0].range()), (StyleId::HEADER, 0..5));
        assert_eq!(lines[1].text_spans().as_slice()[0].range(), 0..8);
        assert!(lines[2].text_spans().is_empty());
        let quoted = lines[5].text_spans().as_slice();
        assert_eq!(quoted[0].style, StyleId::QUOTED);
        assert_eq!(quoted[0].range(), 0..lines[5].num_bytes());
        assert_eq!(lines[7].default_style, StyleId::SIGNATURE);
        assert_eq!(lines[8].default_style, StyleId::SIGNATURE);
        assert!(lines[4].default_style.is_none());
        Ok(())
    }

    #[test]
    fn escape_runs_become_ansi_spans() -> anyhow::Result<()> {
        let mut pf = produce(MESSAGE)?;
        let spans = pf.lines()[6].text_spans().as_slice().to_vec();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].range(), 0..4);
        assert_eq!(spans[0].ansi_start.as_deref(), Some("\x1b[1m"));
        assert_eq!(spans[0].ansi_end.as_deref(), Some("\x1b[0m"));
        assert_eq!(pf.text(6), Some("bold done"));
        Ok(())
    }

    #[test]
    fn quoted_escape_runs_keep_the_quote_colour() -> anyhow::Result<()> {
        let mut pf = produce("> \x1b[1mbold\x1b[0m quote\n")?;
        assert_eq!(pf.lines()[0].default_style, StyleId::QUOTED);
        assert_eq!(pf.lines()[0].text_spans().len(), 3);

        let opts = ViewOptions {
            width: 80,
            flags: WrapFlags::WRAP,
            show_search: true,
            colors: PagerColors::default(),
        };
        let row = render_rows(&mut pf, 0, 1, &opts).remove(0);
        let pieces: Vec<&str> = row.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(pieces, vec!["> ", "bold", " quote"]);
        assert_eq!(row.spans[1].style.fg, Some(Color::Cyan));
        assert!(row.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(row.spans[2].style.fg, Some(Color::Cyan));
        Ok(())
    }

    #[test]
    fn body_without_headers_is_plain() -> anyhow::Result<()> {
        let mut pf = produce("just text: with colon later\nsecond")?;
        assert!(pf.lines()[0].text_spans().is_empty());
        assert!(!pf.lines()[1].is_terminated());
        assert_eq!(pf.text(1), Some("second"));
        Ok(())
    }
}
