use std::path::PathBuf;

use ratatui::style::Color;
use ratmail_pfile::WrapFlags;
use tracing::{debug, warn};

const DEFAULT_TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PagerColors {
    pub(crate) quoted: Color,
    pub(crate) header: Color,
    pub(crate) signature: Color,
    pub(crate) search: Color,
    pub(crate) marker: Color,
}

impl Default for PagerColors {
    fn default() -> Self {
        Self {
            quoted: Color::Cyan,
            header: Color::Yellow,
            signature: Color::DarkGray,
            search: Color::Yellow,
            marker: Color::Green,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PagerConfig {
    pub(crate) wrap: bool,
    pub(crate) markers: bool,
    pub(crate) smart_wrap: bool,
    /// Columns to wrap at; 0 means the terminal width.
    pub(crate) width: usize,
    pub(crate) tab_width: usize,
    pub(crate) show_search: bool,
    /// 0 means unlimited.
    pub(crate) max_matches: usize,
    pub(crate) colors: PagerColors,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            markers: true,
            smart_wrap: false,
            width: 0,
            tab_width: DEFAULT_TAB_WIDTH,
            show_search: true,
            max_matches: 0,
            colors: PagerColors::default(),
        }
    }
}

impl PagerConfig {
    pub(crate) fn wrap_flags(&self) -> WrapFlags {
        let mut flags = WrapFlags::empty();
        flags.set(WrapFlags::WRAP, self.wrap);
        flags.set(WrapFlags::MARKERS, self.markers);
        flags.set(WrapFlags::SMART_WRAP, self.smart_wrap);
        flags
    }
}

pub(crate) fn load_pager_config() -> PagerConfig {
    match load_config_text() {
        Some(content) => parse_pager_config(&content),
        None => PagerConfig::default(),
    }
}

pub(crate) fn parse_pager_config(content: &str) -> PagerConfig {
    let mut config = PagerConfig::default();
    let value: toml::Value = match toml::from_str(content) {
        Ok(value) => value,
        Err(err) => {
            warn!("pager config unreadable: {err}");
            return config;
        }
    };
    let Some(pager) = value.get("pager") else {
        return config;
    };

    let flag = |key: &str, default: bool| match pager.get(key) {
        Some(v) => v
            .as_bool()
            .or_else(|| {
                v.as_str()
                    .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            })
            .unwrap_or(default),
        None => default,
    };
    config.wrap = flag("wrap", config.wrap);
    config.markers = flag("markers", config.markers);
    config.smart_wrap = flag("smart_wrap", config.smart_wrap);
    config.show_search = flag("show_search", config.show_search);

    config.width = match pager.get("width") {
        Some(v) => v.as_integer().unwrap_or(0).max(0) as usize,
        None => 0,
    };
    config.tab_width = pager
        .get("tab_width")
        .and_then(|v| v.as_integer())
        .unwrap_or(DEFAULT_TAB_WIDTH as i64)
        .clamp(1, 16) as usize;
    config.max_matches = match pager.get("max_matches") {
        Some(v) => v.as_integer().unwrap_or(0).max(0) as usize,
        None => 0,
    };

    if let Some(colors) = pager.get("colors").and_then(|v| v.as_table()) {
        let slots: [(&str, &mut Color); 5] = [
            ("quoted", &mut config.colors.quoted),
            ("header", &mut config.colors.header),
            ("signature", &mut config.colors.signature),
            ("search", &mut config.colors.search),
            ("marker", &mut config.colors.marker),
        ];
        for (key, slot) in slots {
            let Some(raw) = colors.get(key).and_then(|v| v.as_str()) else {
                continue;
            };
            match parse_color(raw) {
                Some(color) => *slot = color,
                None => warn!(key, raw, "unknown pager colour ignored"),
            }
        }
    }

    debug!(?config, "pager config loaded");
    config
}

pub(crate) fn parse_color(raw: &str) -> Option<Color> {
    let name = raw.trim().to_ascii_lowercase().replace(['_', '-', ' '], "");
    let color = match name.as_str() {
        "default" | "reset" => Color::Reset,
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        _ => return parse_hex_color(raw),
    };
    Some(color)
}

fn parse_hex_color(raw: &str) -> Option<Color> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn config_path_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("ratmail.toml"),
        xdg_config_dir().join("ratmail").join("ratmail.toml"),
    ]
}

fn xdg_config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn load_config_text() -> Option<String> {
    for path in config_path_candidates() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            debug!(path = %path.display(), "pager config found");
            return Some(content);
        }
    }
    None
}
