// Log sink setup. Logs go to `<home>/.progress/progress.log` as JSON
// lines so failures can be inspected after the session; the console only
// gets them with `--verbose`.

use crate::config::config_dir;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g. `PROGRESS_LOG=debug`.
pub const LOG_ENV: &str = "PROGRESS_LOG";
pub const LOG_FILE_NAME: &str = "progress.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Returns the log file path when the
/// file sink could be opened; otherwise warnings go to stderr.
pub fn init(verbose: bool) -> Option<PathBuf> {
    let path = config_dir().join(LOG_FILE_NAME);
    match open_log(&path) {
        Ok(file) => {
            let file_layer = fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_filter(filter());
            let console_layer = verbose.then(|| {
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_filter(filter())
            });
            let installed = tracing_subscriber::registry()
                .with(file_layer)
                .with(console_layer)
                .try_init();
            installed.ok().map(|()| path)
        }
        Err(e) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(if verbose { "debug" } else { "warn" }))
                .with_writer(io::stderr)
                .try_init();
            tracing::warn!(path = %path.display(), error = %e, "could not open log file");
            None
        }
    }
}
