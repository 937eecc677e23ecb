// Configuration management module
// TOML settings, the API key file and interactive setup

pub mod interactive;
pub mod secrets;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use secrets::{load_api_key, load_api_key_from};
pub use settings::{
    ComputeTarget, Config, ConfigError, DatasetConfig, NarratorConfig, OllamaConfig,
    RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
