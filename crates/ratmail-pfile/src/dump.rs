//! Text dumps of a paged file, for tests and debug logs.

use tracing::debug;

use crate::file::PagedFile;
use crate::line::PagedLine;
use crate::markup::{MarkupList, MarkupSpan};
use crate::style::StyleLookup;

/// Lines logged by [`log_file`]; the rest are only counted.
pub const LOG_LINE_LIMIT: usize = 11;

/// One-line structural dump of every line's counters and spans:
/// `L:<n>:{{b<bytes>:c<cols>:T:{(<style>:<first>-<last>)},S:{...}},...}`.
pub fn compact<S>(file: &PagedFile<S>) -> String {
    compact_lines(file.lines())
}

pub fn compact_lines(lines: &[PagedLine]) -> String {
    let mut out = format!("L:{}:{{", lines.len());
    let parts: Vec<String> = lines.iter().map(compact_line).collect();
    out.push_str(&parts.join(","));
    out.push('}');
    out
}

fn compact_line(line: &PagedLine) -> String {
    let mut out = format!("{{b{}:c{}:", line.num_bytes(), line.num_cols());
    if !line.text_spans().is_empty() {
        out.push_str("T:");
        out.push_str(&compact_spans(line.text_spans()));
    }
    if !line.search_spans().is_empty() {
        out.push_str(",S:");
        out.push_str(&compact_spans(line.search_spans()));
    }
    out.push('}');
    out
}

fn compact_spans(spans: &MarkupList) -> String {
    let parts: Vec<String> = spans
        .iter()
        .map(|span| format!("({}:{}-{})", span.style.0, span.first, span.last))
        .collect();
    format!("{{{}}}", parts.join(","))
}

/// Human-readable description of the first [`LOG_LINE_LIMIT`] lines.
pub fn describe<S>(file: &PagedFile<S>, styles: &dyn StyleLookup) -> Vec<String> {
    let lines = file.lines();
    let mut out = vec![format!("lines ({})", lines.len())];
    for line in lines.iter().take(LOG_LINE_LIMIT) {
        out.push(format!("    offset {}", line.offset()));
        out.push(format!("    {} bytes, {} cols", line.num_bytes(), line.num_cols()));
        if line.default_style.is_none() {
            out.push("    [plain]".to_string());
        } else {
            let name = styles.name(line.default_style).unwrap_or("?");
            out.push(format!("    style {} ({})", name, line.default_style.0));
        }
        describe_spans(&mut out, line.text_spans(), "text", styles);
        describe_spans(&mut out, line.search_spans(), "search", styles);
        out.push("======================".to_string());
    }
    out
}

fn describe_spans(out: &mut Vec<String>, spans: &MarkupList, label: &str, styles: &dyn StyleLookup) {
    out.push(format!("    {} ({})", label, spans.len()));
    for span in spans {
        out.push(describe_span(span, styles));
    }
}

fn describe_span(span: &MarkupSpan, styles: &dyn StyleLookup) -> String {
    let mut text = format!("        [{}-{}] ", span.first, span.last.saturating_sub(1));
    if span.style.is_none() {
        text.push_str("[plain] ");
    } else {
        let name = styles.name(span.style).unwrap_or("?");
        text.push_str(&format!("{}({}) ", name, span.style.0));
    }
    if let Some(start) = &span.ansi_start {
        text.push_str(&format!("ansi_start {:?} ", start));
        text.push_str(&format!(
            "ansi_end {:?} ",
            span.ansi_end.as_deref().unwrap_or("")
        ));
    }
    text.trim_end().to_string()
}

/// Writes [`describe`] to the debug log.
pub fn log_file<S>(file: &PagedFile<S>, styles: &dyn StyleLookup) {
    debug!(file = ?file.id(), owns_store = file.owns_store(), "PagedFile");
    for row in describe(file, styles) {
        debug!("{row}");
    }
}
