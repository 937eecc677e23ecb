use anyhow::Result;
use clap::{Parser, Subcommand};
use cinemate::chat::PresentationMode;
use cinemate::commands::{build, chat, search, show_status};
use cinemate::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinemate")]
#[command(about = "A semantic movie recommendation chatbot backed by local embeddings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the recommender (default)
    Chat {
        /// How recommendations are presented
        #[arg(long, value_enum, default_value_t = PresentationMode::Listing)]
        mode: PresentationMode,
        /// Number of movies per answer, overrides the configured value
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Embed the movie dataset and write the search index
    Build {
        /// CSV dataset to index, overrides the configured path
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Run a single query and print the matches
    Search {
        /// Free-text description of the movie you want
        query: String,
        /// Number of movies to return
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show configuration, model and index status
    Status,
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat {
        mode: PresentationMode::Listing,
        top_k: None,
    });

    match command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Chat { mode, top_k } => {
            chat(&Config::load()?, mode, top_k).await?;
        }
        Commands::Build { dataset } => {
            build(&Config::load()?, dataset.as_deref()).await?;
        }
        Commands::Search { query, top_k } => {
            search(&Config::load()?, &query, top_k).await?;
        }
        Commands::Status => {
            show_status(&Config::load()?).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_defaults_to_chat() {
        let cli = Cli::try_parse_from(["cinemate"]).expect("bare invocation parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn chat_with_mode_and_top_k() {
        let cli = Cli::try_parse_from(["cinemate", "chat", "--mode", "narrated", "--top-k", "3"])
            .expect("chat flags parse");

        match cli.command {
            Some(Commands::Chat { mode, top_k }) => {
                assert_eq!(mode, PresentationMode::Narrated);
                assert_eq!(top_k, Some(3));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn chat_defaults_to_listing() {
        let cli = Cli::try_parse_from(["cinemate", "chat"]).expect("chat parses");

        match cli.command {
            Some(Commands::Chat { mode, top_k }) => {
                assert_eq!(mode, PresentationMode::Listing);
                assert_eq!(top_k, None);
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Cli::try_parse_from(["cinemate", "chat", "--mode", "poetry"]);
        assert!(matches!(
            result.map_err(|e| e.kind()),
            Err(ErrorKind::InvalidValue)
        ));
    }

    #[test]
    fn build_with_dataset_override() {
        let cli = Cli::try_parse_from(["cinemate", "build", "--dataset", "/data/movies.csv"])
            .expect("build parses");

        match cli.command {
            Some(Commands::Build { dataset }) => {
                assert_eq!(dataset, Some(PathBuf::from("/data/movies.csv")));
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn search_requires_query() {
        let result = Cli::try_parse_from(["cinemate", "search"]);
        assert!(matches!(
            result.map_err(|e| e.kind()),
            Err(ErrorKind::MissingRequiredArgument)
        ));

        let cli = Cli::try_parse_from(["cinemate", "search", "heist gone wrong", "--top-k", "2"])
            .expect("search parses");
        match cli.command {
            Some(Commands::Search { query, top_k }) => {
                assert_eq!(query, "heist gone wrong");
                assert_eq!(top_k, Some(2));
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["cinemate", "config", "--show"]).expect("config parses");
        assert!(matches!(cli.command, Some(Commands::Config { show: true })));
    }

    #[test]
    fn status_command() {
        let cli = Cli::try_parse_from(["cinemate", "status"]).expect("status parses");
        assert!(matches!(cli.command, Some(Commands::Status)));
    }
}
