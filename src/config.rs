// Local configuration: the persisted Toggl API key and the runtime
// settings (which backend to talk to, how long to wait for it).
//
// The API key lives in `<home>/.progress/config.json` as the only field
// of a JSON object. The file is created on first run and only read after
// that; re-entering a key means clearing the directory (`--reset`) and
// answering the first-run prompt again.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the user's home holding the config file.
pub const CONFIG_DIR_NAME: &str = ".progress";
/// Name of the config file inside `CONFIG_DIR_NAME`.
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const PRODUCTION_URL: &str = "https://toggl-progress.herokuapp.com";
pub const DEV_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An opaque Toggl API key. `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// On-disk shape of `config.json`.
#[derive(Serialize, Deserialize, Debug)]
struct ConfigFile {
    api_key: ApiKey,
}

/// Where the API key is read from and written to.
pub trait CredentialStore {
    /// Read the stored key. A missing file is `ConfigError::NotFound`.
    fn load(&self) -> Result<ApiKey, ConfigError>;

    /// Persist a key, creating the containing directory if needed.
    fn save(&self, key: &ApiKey) -> Result<(), ConfigError>;
}

/// `CredentialStore` backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `<home>/.progress/config.json`. Falls back to the current
    /// directory when the home directory is unknown.
    pub fn in_home() -> Self {
        FileStore::at(config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the config file (and the log file).
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Delete every file in the config directory: the stored key and the
    /// log. Subdirectories are left alone. Returns how many files were
    /// removed; a missing directory removes nothing.
    pub fn reset(&self) -> Result<usize, ConfigError> {
        let dir = self.dir();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(write_error(dir)(source)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(write_error(dir))?;
            let file_type = entry.file_type().map_err(write_error(&entry.path()))?;
            if file_type.is_dir() {
                continue;
            }
            std::fs::remove_file(entry.path()).map_err(write_error(&entry.path()))?;
            removed += 1;
        }
        Ok(removed)
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<ApiKey, ConfigError> {
        let data = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                ConfigError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let config: ConfigFile =
            serde_json::from_str(&data).map_err(|source| ConfigError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(config.api_key)
    }

    fn save(&self, key: &ApiKey) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            // create_dir_all treats an existing directory as success
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let config = ConfigFile {
            api_key: key.clone(),
        };
        let data = serde_json::to_string(&config).map_err(|source| ConfigError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, data).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Write { path, source }
}

/// `<home>/.progress`, or `./.progress` without a home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Runtime settings for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Duration,
}

impl Settings {
    /// Pick the backend: an explicit URL wins, then `--dev`, then production.
    pub fn resolve(api_url: Option<String>, dev: bool, timeout_secs: u64) -> Self {
        let base_url = match api_url {
            Some(url) => url,
            None if dev => DEV_URL.to_string(),
            None => PRODUCTION_URL.to_string(),
        };
        Settings {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve(None, false, DEFAULT_TIMEOUT_SECS)
    }
}
