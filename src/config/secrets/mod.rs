//! API keys kept outside the settings file.
//!
//! Keys live in a flat JSON object at `~/config.json`, e.g.
//! `{"OMDB_MOVIE_API_KEY": "..."}`.


use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ConfigError;

pub const API_KEYS_FILE_NAME: &str = "config.json";

/// Location of the API key file in the user's home directory
#[inline]
pub fn api_keys_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(API_KEYS_FILE_NAME))
        .ok_or(ConfigError::DirectoryError)
}

/// Read `key` from `~/config.json`
#[inline]
pub fn load_api_key(key: &str) -> Result<String, ConfigError> {
    load_api_key_from(api_keys_path()?, key)
}

#[inline]
pub fn load_api_key_from<P: AsRef<Path>>(path: P, key: &str) -> Result<String, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::MissingApiKeyFile(path.to_path_buf()));
    }

    debug!("Reading API key '{}' from {}", key, path.display());

    let content = fs::read_to_string(path)?;
    let keys: serde_json::Value = serde_json::from_str(&content)?;

    keys.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingApiKey(key.to_string()))
}
