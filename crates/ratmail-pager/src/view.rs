use std::io::{self, IsTerminal, Read, Seek, Write};

use anyhow::Result;
use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::CrosstermBackend,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::Paragraph,
};
use ratmail_pfile::{MarkupSpan, PagedFile, PagedLine, StyleId, WrapFlags, truncate_to_width};

use crate::ansi::sgr_style;
use crate::config::PagerColors;

pub(crate) const MARKER: &str = "+";

#[derive(Debug, Clone)]
pub(crate) struct ViewOptions {
    pub(crate) width: usize,
    pub(crate) flags: WrapFlags,
    pub(crate) show_search: bool,
    pub(crate) colors: PagerColors,
}

/// Rewraps `file` for the view width, or drops rows when wrapping is off.
pub(crate) fn layout<S: Read + Write + Seek>(file: &mut PagedFile<S>, opts: &ViewOptions) {
    let width = if opts.flags.contains(WrapFlags::WRAP) {
        opts.width
    } else {
        usize::MAX
    };
    file.wrap_all(width, opts.flags);
}

/// Styled screen rows starting at virtual row `top`.
pub(crate) fn render_rows<S: Read + Write + Seek>(
    file: &mut PagedFile<S>,
    top: isize,
    rows: usize,
    opts: &ViewOptions,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let Some(start) = file.find_virtual_row(top).pos() else {
        return out;
    };
    let (mut index, mut segment) = (start.line, start.segment);
    while out.len() < rows && index < file.len() {
        let Some(text) = file.text(index).map(str::to_string) else {
            out.push(Line::default());
            index += 1;
            segment = 0;
            continue;
        };
        let line = &file.lines()[index];
        out.push(render_row(line, &text, segment, opts));

        if segment + 1 < line.virtual_rows() {
            segment += 1;
        } else {
            index += 1;
            segment = 0;
        }
    }
    out
}

fn render_row(line: &PagedLine, text: &str, segment: usize, opts: &ViewOptions) -> Line<'static> {
    let mut range = line.segment_range(segment);
    range.end = range.end.min(text.len());
    range.start = range.start.min(range.end);
    if !opts.flags.contains(WrapFlags::WRAP) {
        let (bytes, _) = truncate_to_width(&text[range.clone()], opts.width);
        range.end = range.start + bytes;
    }

    let mut spans = Vec::new();
    if segment > 0 && opts.flags.contains(WrapFlags::MARKERS) {
        spans.push(Span::styled(MARKER, style_for(StyleId::MARKERS, &opts.colors)));
    }

    let base = style_for(line.default_style, &opts.colors);
    let search: &[MarkupSpan] = if opts.show_search {
        line.search_spans().as_slice()
    } else {
        &[]
    };
    let markup = line.text_spans().as_slice();

    let mut cuts = vec![range.start, range.end];
    for span in markup.iter().chain(search) {
        for cut in [span.first, span.last] {
            if range.contains(&cut) && text.is_char_boundary(cut) {
                cuts.push(cut);
            }
        }
    }
    cuts.sort_unstable();
    cuts.dedup();

    for pair in cuts.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let mut style = base;
        for span in markup.iter().filter(|s| s.first <= from && from < s.last) {
            style = style.patch(span_style(span, &opts.colors));
        }
        if search.iter().any(|s| s.first <= from && from < s.last) {
            style = style.patch(style_for(StyleId::SEARCH, &opts.colors));
        }
        spans.push(Span::styled(text[from..to].to_string(), style));
    }
    Line::from(spans)
}

fn span_style(span: &MarkupSpan, colors: &PagerColors) -> Style {
    match &span.ansi_start {
        Some(seq) => sgr_style(seq),
        None => style_for(span.style, colors),
    }
}

pub(crate) fn style_for(id: StyleId, colors: &PagerColors) -> Style {
    match id {
        StyleId::HEADER => Style::default()
            .fg(colors.header)
            .add_modifier(Modifier::BOLD),
        StyleId::QUOTED => Style::default().fg(colors.quoted),
        StyleId::SIGNATURE => Style::default().fg(colors.signature),
        StyleId::SEARCH => Style::default().fg(Color::Black).bg(colors.search),
        StyleId::MARKERS => Style::default().fg(colors.marker),
        StyleId::INDICATOR => Style::default().add_modifier(Modifier::REVERSED),
        _ => Style::default(),
    }
}

pub(crate) fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

/// Prints rows, drawing them with styles when stdout is a terminal.
pub(crate) fn print_rows(lines: Vec<Line<'static>>, plain: bool) -> Result<()> {
    let stdout = io::stdout();
    if plain || !stdout.is_terminal() || lines.is_empty() {
        let mut out = stdout.lock();
        for line in &lines {
            writeln!(out, "{}", line_text(line))?;
        }
        return Ok(());
    }

    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(height),
        },
    )?;
    terminal.draw(|frame| {
        frame.render_widget(Paragraph::new(Text::from(lines)), frame.area());
    })?;
    drop(terminal);
    println!();
    Ok(())
}

/// Columns available when the config leaves the width open.
pub(crate) fn terminal_width() -> usize {
    if !io::stdout().is_terminal() {
        return 80;
    }
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80)
}
