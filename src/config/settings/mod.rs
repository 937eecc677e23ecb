
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_EMBEDDING_MODEL: &str = "mxbai-embed-large:latest";
pub const DEFAULT_NARRATOR_MODEL: &str = "llama3.2:latest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub narrator: NarratorConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where embedding inference runs. Selected once and handed to the client.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTarget {
    #[default]
    Cpu,
    Gpu,
}

impl ComputeTarget {
    pub const ALL: [Self; 2] = [Self::Cpu, Self::Gpu];
}

impl fmt::Display for ComputeTarget {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Gpu => f.write_str("gpu"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub compute_target: ComputeTarget,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: 32,
            timeout_seconds: 120,
            compute_target: ComputeTarget::Cpu,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV file to build the index from; `<base_dir>/movies.csv` when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// LanceDB directory; `<base_dir>/index` when unset
    pub index_dir: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            index_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarratorConfig {
    pub model: String,
    /// Key in `~/config.json` sent as a bearer token to the generate endpoint
    pub api_key_name: Option<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_NARRATOR_MODEL.to_string(),
            api_key_name: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine a home directory for ~/.cinemate")]
    DirectoryError,
    #[error("Ollama URL is not valid: {0}")]
    InvalidUrl(String),
    #[error("Port {0} is out of range (1-65535)")]
    InvalidPort(u16),
    #[error("Batch size {0} is out of range (1-1000)")]
    InvalidBatchSize(u32),
    #[error("Model name '{0}' is empty")]
    InvalidModel(String),
    #[error("Protocol '{0}' is not supported, use http or https")]
    InvalidProtocol(String),
    #[error("Timeout {0}s is out of range (1-3600)")]
    InvalidTimeout(u64),
    #[error("top_k {0} is out of range (1-100)")]
    InvalidTopK(usize),
    #[error("API key file not found: {}", .0.display())]
    MissingApiKeyFile(PathBuf),
    #[error("API key '{0}' is missing or not a string")]
    MissingApiKey(String),
    #[error("API key file is not valid JSON: {0}")]
    ApiKeyParse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file is not valid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config could not be written as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn check_protocol(protocol: &str) -> Result<(), ConfigError> {
    if matches!(protocol, "http" | "https") {
        Ok(())
    } else {
        Err(ConfigError::InvalidProtocol(protocol.to_string()))
    }
}

fn check_port(port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        Err(ConfigError::InvalidPort(port))
    } else {
        Ok(())
    }
}

fn check_model(model: &str) -> Result<(), ConfigError> {
    if model.trim().is_empty() {
        Err(ConfigError::InvalidModel(model.to_string()))
    } else {
        Ok(())
    }
}

fn check_batch_size(batch_size: u32) -> Result<(), ConfigError> {
    if (1..=1000).contains(&batch_size) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBatchSize(batch_size))
    }
}

fn check_timeout(timeout_seconds: u64) -> Result<(), ConfigError> {
    if (1..=3600).contains(&timeout_seconds) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout(timeout_seconds))
    }
}

fn check_top_k(top_k: usize) -> Result<(), ConfigError> {
    if (1..=100).contains(&top_k) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTopK(top_k))
    }
}

fn base_url(protocol: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    let raw = format!("{protocol}://{host}:{port}");
    if host.trim().is_empty() {
        return Err(ConfigError::InvalidUrl(raw));
    }
    Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw))
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        let base_dir = Self::config_dir().unwrap_or_else(|_| PathBuf::from(".cinemate"));
        Self::with_base_dir(base_dir)
    }
}

impl Config {
    /// Default settings rooted at `base_dir`
    #[inline]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            ollama: OllamaConfig::default(),
            dataset: DatasetConfig::default(),
            retrieval: RetrievalConfig::default(),
            narrator: NarratorConfig::default(),
            base_dir: base_dir.into(),
        }
    }

    /// `~/.cinemate`, or the platform data dir on Windows without a home
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".cinemate"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("cinemate"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default configuration directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_from(config_dir)
    }

    /// Load `config.toml` from `config_dir`. A missing file yields defaults
    /// rooted there; a present file must parse and validate.
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let base_dir = config_dir.as_ref().to_path_buf();
        let path = base_dir.join(CONFIG_FILE_NAME);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::with_base_dir(base_dir));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let parsed: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let config = Self { base_dir, ..parsed };
        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(config)
    }

    /// Validate, then write `config.toml` into the base directory
    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate().context("Refusing to save invalid settings")?;

        let base_dir = self.get_base_dir();
        fs::create_dir_all(base_dir)
            .with_context(|| format!("Failed to create {}", base_dir.display()))?;

        let path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.retrieval.validate()?;
        check_model(&self.narrator.model)
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Path of the CSV dataset used by `build`
    #[inline]
    pub fn dataset_path(&self) -> PathBuf {
        self.dataset
            .path
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("movies.csv"))
    }

    /// Path of the LanceDB directory holding the movie index
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.retrieval
            .index_dir
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("index"))
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_protocol(&self.protocol)?;
        self.ollama_url()?;
        check_port(self.port)?;
        check_model(&self.model)?;
        check_batch_size(self.batch_size)?;
        check_timeout(self.timeout_seconds)
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        base_url(&self.protocol, &self.host, self.port)
    }

    #[inline]
    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        check_protocol(&protocol)?;
        self.protocol = protocol;
        Ok(())
    }

    /// The host must form a valid URL with the current protocol and port
    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        base_url(&self.protocol, &host, self.port)?;
        self.host = host;
        Ok(())
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        check_port(port)?;
        self.port = port;
        Ok(())
    }

    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        check_model(&model)?;
        self.model = model;
        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        check_batch_size(batch_size)?;
        self.batch_size = batch_size;
        Ok(())
    }

    #[inline]
    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        check_timeout(timeout_seconds)?;
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_top_k(self.top_k)
    }

    #[inline]
    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        check_top_k(top_k)?;
        self.top_k = top_k;
        Ok(())
    }
}
