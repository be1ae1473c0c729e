use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use exn::ResultExt;
use serde::Deserialize;
use tagger_index::CaseFolding;

use crate::commands::Strings;

/// Environment variable naming an explicit configuration file.
const CONFIG_ENV: &str = "TAGGER_CONFIG";
const APP_DIR: &str = "tagger";
const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "tagger.json";
const DEFAULT_BOT_NAME: &str = "mention-bot";

#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// Bot configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the JSON store. Defaults to the platform data directory.
    pub storage: Option<PathBuf>,
    /// Keep tags exactly as typed instead of lower-casing them.
    pub case_sensitive: bool,
    /// Name shown in the help text.
    pub bot_name: String,
    /// Sender identity for messages typed on the terminal.
    pub user: Option<String>,
    pub telegram: Option<Telegram>,
    pub strings: Strings,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Telegram {
    pub bot_token: String,
    /// Only accept messages from this chat. Any chat when absent.
    #[serde(default)]
    pub chat_id: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: None,
            case_sensitive: false,
            bot_name: DEFAULT_BOT_NAME.to_owned(),
            user: None,
            telegram: None,
            strings: Strings::default(),
        }
    }
}

impl Config {
    /// Load from `$TAGGER_CONFIG`, or from the platform config directory.
    ///
    /// A file named by the environment variable must exist; the default
    /// location is optional and falls back to [`Config::default`].
    pub fn load() -> exn::Result<Self, Error> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)) {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> exn::Result<Self, Error> {
        let text = fs::read_to_string(path)
            .or_raise(|| Error(format!("read config {}", path.display())))?;
        let config = serde_json::from_str(&text)
            .or_raise(|| Error(format!("parse config {}", path.display())))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    #[must_use]
    pub const fn folding(&self) -> CaseFolding {
        if self.case_sensitive {
            CaseFolding::Sensitive
        } else {
            CaseFolding::Insensitive
        }
    }

    /// Where the JSON store lives.
    pub fn storage_path(&self) -> exn::Result<PathBuf, Error> {
        if let Some(path) = &self.storage {
            return Ok(path.clone());
        }
        let Some(dir) = dirs::data_dir() else {
            exn::bail!(Error("could not determine data directory".into()));
        };
        Ok(dir.join(APP_DIR).join(STORE_FILE))
    }

    /// Sender name for terminal input: the configured user, then `$USER`.
    #[must_use]
    pub fn terminal_user(&self) -> String {
        self.user
            .clone()
            .or_else(|| env::var("USER").ok())
            .unwrap_or_else(|| "me".to_owned())
    }
}
