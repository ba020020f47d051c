//! Embedded escape sequences in producer input.

use ratatui::style::{Color, Modifier, Style};

pub(crate) const SGR_RESET: &str = "\x1b[0m";

/// A run of text and the SGR sequences active over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
    /// Concatenated SGR sequences, empty for plain text.
    pub(crate) sgr: String,
    pub(crate) text: String,
}

/// Splits `line` at SGR sequences. Other CSI sequences are dropped.
pub(crate) fn split_sgr(line: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut active = String::new();
    let mut text = String::new();
    let mut rest = line;

    while let Some(pos) = rest.find('\x1b') {
        text.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let Some(csi) = after.strip_prefix('[') else {
            rest = after;
            continue;
        };
        let Some(end) = csi.find(|c: char| ('@'..='~').contains(&c)) else {
            rest = "";
            break;
        };
        rest = &csi[end + 1..];
        if !csi[end..].starts_with('m') {
            continue;
        }
        let seq = &line[line.len() - csi.len() - 2..line.len() - rest.len()];
        let next = if is_reset(&csi[..end]) {
            String::new()
        } else {
            format!("{active}{seq}")
        };
        if next != active {
            flush(&mut chunks, &active, &mut text);
            active = next;
        }
    }
    text.push_str(rest);
    flush(&mut chunks, &active, &mut text);
    chunks
}

fn flush(chunks: &mut Vec<Chunk>, active: &str, text: &mut String) {
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk {
        sgr: active.to_string(),
        text: std::mem::take(text),
    });
}

fn is_reset(params: &str) -> bool {
    params.split(';').all(|p| p.is_empty() || p == "0")
}

/// Terminal style described by a string of SGR sequences.
pub(crate) fn sgr_style(seqs: &str) -> Style {
    let mut style = Style::default();
    for seq in seqs.split('\x1b').filter(|s| !s.is_empty()) {
        let Some(params) = seq.strip_prefix('[').and_then(|s| s.strip_suffix('m')) else {
            continue;
        };
        let codes: Vec<u16> = params
            .split(';')
            .map(|p| p.parse::<u16>().unwrap_or(0))
            .collect();
        let mut idx = 0;
        while idx < codes.len() {
            let code = codes[idx];
            idx += 1;
            style = match code {
                0 => Style::default(),
                1 => style.add_modifier(Modifier::BOLD),
                2 => style.add_modifier(Modifier::DIM),
                3 => style.add_modifier(Modifier::ITALIC),
                4 => style.add_modifier(Modifier::UNDERLINED),
                5 => style.add_modifier(Modifier::SLOW_BLINK),
                7 => style.add_modifier(Modifier::REVERSED),
                9 => style.add_modifier(Modifier::CROSSED_OUT),
                22 => style.remove_modifier(Modifier::BOLD | Modifier::DIM),
                23 => style.remove_modifier(Modifier::ITALIC),
                24 => style.remove_modifier(Modifier::UNDERLINED),
                27 => style.remove_modifier(Modifier::REVERSED),
                30..=37 => style.fg(Color::Indexed((code - 30) as u8)),
                39 => style.fg(Color::Reset),
                40..=47 => style.bg(Color::Indexed((code - 40) as u8)),
                49 => style.bg(Color::Reset),
                90..=97 => style.fg(Color::Indexed((code - 90 + 8) as u8)),
                100..=107 => style.bg(Color::Indexed((code - 100 + 8) as u8)),
                38 | 48 => {
                    let (color, used) = extended_color(&codes[idx..]);
                    idx += used;
                    match (code, color) {
                        (38, Some(color)) => style.fg(color),
                        (_, Some(color)) => style.bg(color),
                        (_, None) => style,
                    }
                }
                _ => style,
            };
        }
    }
    style
}

// `5;n` or `2;r;g;b` after a 38/48.
fn extended_color(codes: &[u16]) -> (Option<Color>, usize) {
    match codes {
        [5, n, ..] => (Some(Color::Indexed(*n as u8)), 2),
        [2, r, g, b, ..] => (Some(Color::Rgb(*r as u8, *g as u8, *b as u8)), 4),
        _ => (None, codes.len()),
    }
}
