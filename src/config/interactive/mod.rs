#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{ComputeTarget, Config, ConfigError, NarratorConfig, OllamaConfig};
use crate::embeddings::OllamaClient;

const PROTOCOLS: [&str; 2] = ["http", "https"];

/// Walk the user through every setting, check the server, then save
#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 CineMate Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    section("Ollama", "The local server that embeds movies and queries.");
    configure_ollama(&mut config.ollama)?;

    section("Movies", "Where the dataset is read from and the index is written.");
    configure_storage(&mut config)?;

    section("Narration", "Optional generative model for `chat --mode narrated`.");
    configure_narrator(&mut config.narrator)?;

    eprintln!();
    eprintln!("{}", style("Contacting Ollama...").yellow());
    match check_connection(&config.ollama) {
        Ok(()) => eprintln!("{}", style("✓ Ollama is reachable").green()),
        Err(e) => {
            eprintln!("{} {}", style("⚠ Could not reach Ollama:").yellow(), e);
            eprintln!("Start Ollama before running `cinemate build` or `cinemate chat`.");
        }
    }

    eprintln!();
    let save = Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?;

    if save {
        config.save().context("Failed to save configuration")?;
        eprintln!(
            "{} {}",
            style("✓ Saved to").green(),
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

/// Print the effective configuration, defaults included
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());

    heading("Ollama");
    match config.ollama_url() {
        Ok(url) => field("URL", url),
        Err(e) => field("URL", format!("{} ({})", style("invalid").red(), e)),
    }
    field("Embedding model", &config.ollama.model);
    field("Batch size", config.ollama.batch_size);
    field("Timeout", format!("{}s", config.ollama.timeout_seconds));
    field("Compute target", config.ollama.compute_target);

    heading("Movies");
    field("Dataset", config.dataset_path().display());
    field("Index", config.index_path().display());
    field("Top K", config.retrieval.top_k);

    heading("Narration");
    field("Model", &config.narrator.model);
    field(
        "API key",
        config.narrator.api_key_name.as_deref().unwrap_or("none"),
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn section(title: &str, blurb: &str) {
    eprintln!();
    eprintln!("{}", style(title).bold().yellow());
    eprintln!("{}", style(blurb).dim());
}

fn heading(title: &str) {
    eprintln!();
    eprintln!("{}", style(format!("{title}:")).bold().yellow());
}

fn field(label: &str, value: impl std::fmt::Display) {
    eprintln!("  {label}: {}", style(value).cyan());
}

fn load_existing_config() -> Result<Config> {
    match Config::load() {
        Ok(config) => {
            eprintln!("{}", style("Editing existing configuration.").green());
            Ok(config)
        }
        Err(e) => {
            eprintln!(
                "{} ({e:#})",
                style("Starting from defaults").yellow()
            );
            Ok(Config::default())
        }
    }
}

/// Prompt for a value, re-asking until `check` accepts it
fn ask<T>(prompt: &str, default: T, check: impl Fn(&T) -> Result<(), ConfigError>) -> Result<T>
where
    T: Clone + ToString + FromStr,
    <T as FromStr>::Err: ToString,
{
    Ok(Input::new()
        .with_prompt(prompt)
        .default(default)
        .validate_with(|input: &T| check(input).map_err(|e| e.to_string()))
        .interact_text()?)
}

fn choose<T: ToString + PartialEq>(prompt: &str, options: &[T], current: &T) -> Result<usize> {
    let default = options.iter().position(|o| o == current).unwrap_or(0);
    Ok(Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(default)
        .interact()?)
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocol = PROTOCOLS[choose("Protocol", &PROTOCOLS, &ollama.protocol.as_str())?];
    ollama.set_protocol(protocol.to_string())?;

    let scratch = ollama.clone();
    let host = ask("Host", ollama.host.clone(), |host| {
        scratch.clone().set_host(host.clone())
    })?;
    ollama.set_host(host)?;

    let port = ask("Port", ollama.port, |port| scratch.clone().set_port(*port))?;
    ollama.set_port(port)?;

    let model = ask("Embedding model", ollama.model.clone(), |model| {
        scratch.clone().set_model(model.clone())
    })?;
    ollama.set_model(model)?;

    let batch_size = ask("Batch size", ollama.batch_size, |size| {
        scratch.clone().set_batch_size(*size)
    })?;
    ollama.set_batch_size(batch_size)?;

    let timeout = ask("Request timeout (seconds)", ollama.timeout_seconds, |secs| {
        scratch.clone().set_timeout_seconds(*secs)
    })?;
    ollama.set_timeout_seconds(timeout)?;

    let targets = ComputeTarget::ALL;
    ollama.compute_target =
        targets[choose("Compute target", &targets, &ollama.compute_target)?];

    Ok(())
}

fn configure_storage(config: &mut Config) -> Result<()> {
    let dataset = ask(
        "Movie dataset (CSV)",
        config.dataset_path().display().to_string(),
        |_| Ok(()),
    )?;
    config.dataset.path = Some(PathBuf::from(dataset));

    let index = ask(
        "Index directory",
        config.index_path().display().to_string(),
        |_| Ok(()),
    )?;
    config.retrieval.index_dir = Some(PathBuf::from(index));

    let scratch = config.retrieval.clone();
    let top_k = ask("Recommendations per query", config.retrieval.top_k, |k| {
        scratch.clone().set_top_k(*k)
    })?;
    config.retrieval.set_top_k(top_k)?;

    Ok(())
}

fn configure_narrator(narrator: &mut NarratorConfig) -> Result<()> {
    narrator.model = ask("Narration model", narrator.model.clone(), |model| {
        if model.trim().is_empty() {
            Err(ConfigError::InvalidModel(model.clone()))
        } else {
            Ok(())
        }
    })?;

    let key_name = ask(
        "API key name in ~/config.json (blank for none)",
        narrator.api_key_name.clone().unwrap_or_default(),
        |_| Ok(()),
    )?;
    narrator.api_key_name = Some(key_name.trim().to_string()).filter(|k| !k.is_empty());

    Ok(())
}

/// Ping the server with a short timeout. The model does not need to be pulled yet.
fn check_connection(ollama: &OllamaConfig) -> crate::Result<()> {
    OllamaClient::new(ollama)?
        .with_timeout(Duration::from_secs(5))
        .ping()
}
