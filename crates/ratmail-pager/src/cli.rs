use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ratmail_pfile::{PagedFile, SearchDirection, SimplePagerSearch, dump};
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use crate::config::PagerConfig;
use crate::producer::MessageProducer;
use crate::view::{ViewOptions, layout, print_rows, render_rows, terminal_width};

pub(crate) const CLI_SCHEMA_VERSION: &str = "ratmail.pager.v1";

#[derive(Parser, Debug)]
#[command(name = "ratmail-pager", about = "Page, search and inspect message text")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: PagerCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PagerCommand {
    View(ViewCmd),
    Search(SearchCmd),
    Dump(DumpCmd),
}

#[derive(Args, Debug, Default)]
pub(crate) struct LayoutArgs {
    /// Columns to wrap at, 0 for the terminal width.
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    no_wrap: bool,
    #[arg(long)]
    no_markers: bool,
    #[arg(long)]
    smart_wrap: bool,
    #[arg(long)]
    tab_width: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct ViewCmd {
    /// Message file, stdin when absent or `-`.
    file: Option<PathBuf>,
    #[command(flatten)]
    layout: LayoutArgs,
    /// First virtual row to show; defaults to the first search hit.
    #[arg(long, allow_hyphen_values = true)]
    top: Option<isize>,
    /// Rows to show, 0 for all.
    #[arg(long, default_value_t = 0)]
    rows: usize,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    hide_search: bool,
    /// Never draw with terminal styles.
    #[arg(long)]
    plain: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SearchCmd {
    file: PathBuf,
    pattern: String,
    #[command(flatten)]
    layout: LayoutArgs,
    /// Line the search starts from.
    #[arg(long, default_value_t = 0)]
    from: usize,
    #[arg(long)]
    backward: bool,
    /// Number of `next` steps to take.
    #[arg(long, default_value_t = 1)]
    count: usize,
}

#[derive(Args, Debug)]
pub(crate) struct DumpCmd {
    file: PathBuf,
    #[command(flatten)]
    layout: LayoutArgs,
}

pub(crate) fn output_ok(value: JsonValue) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string(&json!({
            "schema": CLI_SCHEMA_VERSION,
            "ok": true,
            "result": value
        }))?
    );
    Ok(())
}

pub(crate) fn output_error(message: &str) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string(&json!({
            "schema": CLI_SCHEMA_VERSION,
            "ok": false,
            "error": message
        }))?
    );
    Ok(())
}

pub(crate) fn run_cli(command: PagerCommand, config: PagerConfig) -> Result<()> {
    match command {
        PagerCommand::View(cmd) => run_view(cmd, config),
        PagerCommand::Search(cmd) => match search_json(&cmd, config) {
            Ok(value) => output_ok(value),
            Err(err) => output_error(&err.to_string()),
        },
        PagerCommand::Dump(cmd) => match dump_json(&cmd, config) {
            Ok(value) => output_ok(value),
            Err(err) => output_error(&err.to_string()),
        },
    }
}

fn apply_layout(config: &mut PagerConfig, args: &LayoutArgs) {
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(tab_width) = args.tab_width {
        config.tab_width = tab_width.clamp(1, 16);
    }
    config.wrap &= !args.no_wrap;
    config.markers &= !args.no_markers;
    config.smart_wrap |= args.smart_wrap;
}

fn view_options(config: &PagerConfig) -> ViewOptions {
    let width = match config.width {
        0 => terminal_width(),
        width => width,
    };
    ViewOptions {
        width,
        flags: config.wrap_flags(),
        show_search: config.show_search,
        colors: config.colors.clone(),
    }
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Can't open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn load_message(path: Option<&Path>, config: &PagerConfig) -> Result<PagedFile> {
    let mut file = PagedFile::new()?;
    MessageProducer::new(config.tab_width).read_all(&mut file, open_input(path)?)?;
    Ok(file)
}

fn new_search(config: &PagerConfig) -> SimplePagerSearch {
    let mut search = SimplePagerSearch::new().with_match_limit(config.max_matches);
    search.set_show_search(config.show_search);
    search
}

fn run_view(cmd: ViewCmd, mut config: PagerConfig) -> Result<()> {
    apply_layout(&mut config, &cmd.layout);
    config.show_search &= !cmd.hide_search;
    let opts = view_options(&config);
    let mut file = load_message(cmd.file.as_deref(), &config)?;
    layout(&mut file, &opts);

    let mut top = cmd.top;
    if let Some(pattern) = cmd.search.as_deref() {
        let mut search = new_search(&config);
        search.set_lines(Some(&file));
        let summary = search.search(&mut file, pattern, 0, SearchDirection::Forward)?;
        debug!(pattern, matches = summary.matches, "view search");
        if top.is_none() {
            top = summary.first.map(|hit| hit.virtual_row as isize);
        }
    }

    let rows = match cmd.rows {
        0 => file.count_virtual_rows(),
        rows => rows,
    };
    let lines = render_rows(&mut file, top.unwrap_or(0), rows, &opts);
    print_rows(lines, cmd.plain)
}

pub(crate) fn search_json(cmd: &SearchCmd, mut config: PagerConfig) -> Result<JsonValue> {
    apply_layout(&mut config, &cmd.layout);
    let mut file = load_message(Some(&cmd.file), &config)?;
    layout(&mut file, &view_options(&config));
    search_file(&mut file, cmd, &config)
}

fn search_file<S: Read + Write + Seek>(
    file: &mut PagedFile<S>,
    cmd: &SearchCmd,
    config: &PagerConfig,
) -> Result<JsonValue> {
    let direction = if cmd.backward {
        SearchDirection::Backward
    } else {
        SearchDirection::Forward
    };
    let mut search = new_search(config);
    search.set_lines(Some(&*file));
    let summary = search.search(file, &cmd.pattern, cmd.from, direction)?;

    let mut hits = Vec::new();
    let mut row = cmd.from;
    for _ in 0..cmd.count {
        let Some(hit) = search.next(file, row, direction)? else {
            break;
        };
        row = hit.line;
        hits.push(hit);
    }
    Ok(json!({
        "pattern": cmd.pattern,
        "direction": direction,
        "summary": summary,
        "hits": hits,
    }))
}

pub(crate) fn dump_json(cmd: &DumpCmd, mut config: PagerConfig) -> Result<JsonValue> {
    apply_layout(&mut config, &cmd.layout);
    let mut file = load_message(Some(&cmd.file), &config)?;
    layout(&mut file, &view_options(&config));
    Ok(dump_value(&file))
}

fn dump_value<S>(file: &PagedFile<S>) -> JsonValue {
    let lines: Vec<JsonValue> = file
        .lines()
        .iter()
        .map(|line| {
            json!({
                "offset": line.offset(),
                "bytes": line.num_bytes(),
                "cols": line.num_cols(),
                "style": line.default_style,
                "segments": line.segments(),
                "text": line.text_spans(),
                "search": line.search_spans(),
            })
        })
        .collect();
    json!({
        "compact": dump::compact(file),
        "rows": file.count_virtual_rows(),
        "lines": lines,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::{Cli, PagerCommand, dump_json, search_json};
    use crate::config::PagerConfig;

    fn message_file(text: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(text.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn parses_subcommands() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "ratmail-pager", "view", "msg.txt", "--top", "-2", "--rows", "5", "--no-wrap",
        ])?;
        let PagerCommand::View(cmd) = cli.command else {
            anyhow::bail!("expected view");
        };
        assert_eq!(cmd.top, Some(-2));
        assert_eq!(cmd.rows, 5);
        assert!(cmd.layout.no_wrap);

        let cli = Cli::try_parse_from(["ratmail-pager", "search", "m", "re", "--backward"])?;
        assert!(matches!(cli.command, PagerCommand::Search(ref cmd) if cmd.backward && cmd.count == 1));
        assert!(Cli::try_parse_from(["ratmail-pager", "dump"]).is_err());
        Ok(())
    }

    #[test]
    fn search_walks_hits_with_wraparound() -> anyhow::Result<()> {
        let file = message_file("one\ntwo match\nthree\nfour match\n")?;
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "ratmail-pager", "search", path.as_str(), "match", "--count", "3", "--width", "40",
        ])?;
        let PagerCommand::Search(cmd) = cli.command else {
            anyhow::bail!("expected search");
        };
        let value = search_json(&cmd, PagerConfig::default())?;
        assert_eq!(value["summary"]["matches"], 2);
        assert_eq!(value["summary"]["first"]["line"], 1);
        let lines: Vec<u64> = value["hits"]
            .as_array()
            .map(|hits| hits.iter().filter_map(|h| h["line"].as_u64()).collect())
            .unwrap_or_default();
        assert_eq!(lines, vec![1, 3, 1]);
        assert_eq!(value["direction"], "forward");
        Ok(())
    }

    #[test]
    fn bad_pattern_is_an_error() -> anyhow::Result<()> {
        let file = message_file("text\n")?;
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["ratmail-pager", "search", path.as_str(), "a("])?;
        let PagerCommand::Search(cmd) = cli.command else {
            anyhow::bail!("expected search");
        };
        let err = search_json(&cmd, PagerConfig::default())
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert!(err.to_string().contains("invalid pattern"));
        Ok(())
    }

    #[test]
    fn dump_reports_rows_and_compact_form() -> anyhow::Result<()> {
        let file = message_file("> 0123456789abcdef\nplain\n")?;
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["ratmail-pager", "dump", path.as_str(), "--width", "10"])?;
        let PagerCommand::Dump(cmd) = cli.command else {
            anyhow::bail!("expected dump");
        };
        let value = dump_json(&cmd, PagerConfig::default())?;
        assert_eq!(
            value["compact"],
            "L:2:{{b18:c18:T:{(30:0-18)}},{b5:c5:}}"
        );
        // 10 + 9 columns, then the short line.
        assert_eq!(value["rows"], 3);
        assert_eq!(value["lines"][0]["segments"][1]["offset_bytes"], 10);
        Ok(())
    }
}
