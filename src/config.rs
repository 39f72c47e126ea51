use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RT04F_DATA_DIR";

/// Where the protocol files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the `<stem>-<subset>-en.{uem,mdtm}` files.
    #[serde(default = "Config::bundled_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::bundled_data_dir(),
        }
    }
}

impl Config {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The `data/` directory shipped alongside the crate.
    pub fn bundled_data_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DatabaseError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            DatabaseError::Config(format!("invalid config '{}': {e}", path.display()))
        })
    }

    /// `$RT04F_DATA_DIR` when set, the bundled data directory otherwise.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => {
                debug!("data directory from {DATA_DIR_ENV}: {:?}", dir);
                Self::with_data_dir(dir)
            }
            _ => Self::default(),
        }
    }

    /// Config file when given, environment/bundled default otherwise.
    pub fn resolve(config_file: Option<&Path>) -> Result<Self> {
        match config_file {
            Some(path) => Self::load(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Path of one file of a `(stem, subset)` pair, e.g. `rt04f-dev-en.uem`.
    pub fn file_path(&self, stem: &str, subset: &str, extension: &str) -> PathBuf {
        self.data_dir
            .join(format!("{stem}-{subset}-en.{extension}"))
    }
}
