use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RATMAIL_LOG";

/// Sends `tracing` output to the state-dir log file when `RATMAIL_LOG` is set.
pub(crate) fn init_logging() {
    let Ok(raw) = std::env::var(LOG_ENV) else {
        return;
    };
    let path = log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };
    let filter = EnvFilter::try_new(log_directive(&raw)).unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn log_directive(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.is_empty() || raw == "1" || raw.eq_ignore_ascii_case("true") {
        "debug"
    } else {
        raw
    }
}

fn log_path() -> PathBuf {
    let base = std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
        })
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join("ratmail").join("ratmail-pager.log")
}

#[cfg(test)]
mod tests {
    use super::log_directive;

    #[test]
    fn truthy_values_mean_debug() {
        assert_eq!(log_directive("1"), "debug");
        assert_eq!(log_directive("TRUE"), "debug");
        assert_eq!(log_directive(""), "debug");
        assert_eq!(log_directive("ratmail_pfile=trace"), "ratmail_pfile=trace");
    }
}
