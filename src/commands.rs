use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufReader, stdin, stdout};
use std::path::Path;
use tracing::{info, warn};

use crate::CinemateError;
use crate::chat::{
    ChatSession, LISTING_HEADER, NO_MATCHES, OllamaNarrator, PresentationMode,
    format_recommendation,
};
use crate::config::{Config, load_api_key};
use crate::dataset::{MovieRecord, load_movie_dataset};
use crate::embeddings::{Embedder, OllamaClient, build_index};
use crate::index::{IndexManifest, MovieIndex, persist};
use crate::retriever::Retriever;

/// Ollama client for the configured embedding model, checked for readiness
#[inline]
pub fn connect_embedder(config: &Config) -> Result<OllamaClient> {
    let client =
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client from config")?;
    client
        .health_check()
        .context("Embedding model is not ready")?;
    Ok(client)
}

fn connect_narrator(config: &Config) -> Result<OllamaNarrator> {
    let mut client = OllamaClient::new(&config.ollama)
        .context("Failed to create Ollama client from config")?
        .with_model(config.narrator.model.clone());

    if let Some(key_name) = &config.narrator.api_key_name {
        let key = load_api_key(key_name)
            .with_context(|| format!("Failed to load API key '{}'", key_name))?;
        client = client.with_bearer_token(key);
    }

    client
        .validate_model()
        .context("Narration model is not ready")?;
    Ok(OllamaNarrator::new(client))
}

fn top_k_or_default(config: &Config, top_k: Option<usize>) -> Result<usize> {
    let mut retrieval = config.retrieval.clone();
    if let Some(top_k) = top_k {
        retrieval.set_top_k(top_k)?;
    }
    Ok(retrieval.top_k)
}

/// Embed every movie in `dataset_path` and write the index to `artifact_dir`
#[inline]
pub async fn build_movie_index<E: Embedder>(
    embedder: &E,
    dataset_path: &Path,
    artifact_dir: &Path,
    batch_size: usize,
) -> Result<IndexManifest> {
    let movies = load_movie_dataset(dataset_path)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;

    let vectors = embed_movies(embedder, &movies, batch_size.max(1))?;
    let index = build_index(vectors).context("Failed to build vector index")?;

    persist(&index, &movies, artifact_dir, embedder.model_name())
        .await
        .with_context(|| format!("Failed to write index to {}", artifact_dir.display()))
}

fn embed_movies<E: Embedder>(
    embedder: &E,
    movies: &[MovieRecord],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = movies.iter().map(MovieRecord::embedding_text).collect();

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(texts.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding movies {msg}")
                .context("Invalid progress bar template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        vectors.extend(embedder.embed(batch).context("Failed to embed movies")?);
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();

    info!("Embedded {} movies", vectors.len());
    Ok(vectors)
}

/// `cinemate build`
#[inline]
pub async fn build(config: &Config, dataset: Option<&Path>) -> Result<()> {
    let dataset_path = dataset.map_or_else(|| config.dataset_path(), Path::to_path_buf);
    let artifact_dir = config.index_path();
    let embedder = connect_embedder(config)?;

    println!(
        "📚 Building movie index from {} with {}",
        dataset_path.display(),
        embedder.model_name()
    );

    let manifest = build_movie_index(
        &embedder,
        &dataset_path,
        &artifact_dir,
        config.ollama.batch_size as usize,
    )
    .await?;

    println!(
        "{} Indexed {} movies ({}-d) into {}",
        style("✅").green(),
        manifest.rows,
        manifest.dimension,
        artifact_dir.display()
    );
    Ok(())
}

/// Build the index from the configured dataset if it is missing
#[inline]
pub async fn ensure_index(config: &Config, embedder: &OllamaClient) -> Result<()> {
    let artifact_dir = config.index_path();
    match MovieIndex::open(&artifact_dir).await {
        Ok(_) => Ok(()),
        Err(CinemateError::NotFound { .. }) => {
            println!("⚠️ Embeddings not found, generating them now...");
            build_movie_index(
                embedder,
                &config.dataset_path(),
                &artifact_dir,
                config.ollama.batch_size as usize,
            )
            .await?;
            println!("✅ Embeddings successfully generated and stored.");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to open movie index"),
    }
}

/// `cinemate chat`
#[inline]
pub async fn chat(config: &Config, mode: PresentationMode, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k_or_default(config, top_k)?;
    let embedder = connect_embedder(config)?;
    ensure_index(config, &embedder).await?;

    let retriever = Retriever::load(&config.index_path(), embedder)
        .await
        .context("Failed to load movie index")?;
    info!(
        "Chat ready: {} movies, mode {}, top_k {}",
        retriever.len(),
        mode,
        top_k
    );

    let session = ChatSession::new(retriever, top_k);
    let session = match mode {
        PresentationMode::Listing => session,
        PresentationMode::Narrated => session.with_narrator(Box::new(connect_narrator(config)?)),
    };

    session
        .run(BufReader::new(stdin()), stdout())
        .await
        .context("Chat session failed")
}

/// `cinemate search QUERY`
#[inline]
pub async fn search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k_or_default(config, top_k)?;
    let embedder = connect_embedder(config)?;
    let retriever = Retriever::load(&config.index_path(), embedder)
        .await
        .context("Failed to load movie index")?;

    let recommendations = retriever
        .search(query, top_k)
        .await
        .context("Search failed")?;

    if recommendations.is_empty() {
        println!("{NO_MATCHES}");
        return Ok(());
    }

    println!("{LISTING_HEADER}");
    for recommendation in &recommendations {
        println!("{}", format_recommendation(&recommendation.movie));
        println!(
            "{}",
            style(format!("   distance {:.4}", recommendation.distance)).dim()
        );
        println!("\n{}", "-".repeat(50));
    }
    Ok(())
}

/// `cinemate status`
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 CineMate Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📁 Paths:");
    println!("   Config:  {}", config.config_file_path().display());
    println!("   Dataset: {}", config.dataset_path().display());
    println!("   Index:   {}", config.index_path().display());
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🖥️  Compute: {}", config.ollama.compute_target);
            }
            Err(e) => println!("   ⚠️  Ollama: Unavailable - {}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {}", e),
    }
    println!();

    println!("🔍 Movie Index Status:");
    let artifact_dir = config.index_path();
    match MovieIndex::open(&artifact_dir).await {
        Ok(index) => {
            let rows = index.count().await.context("Failed to count index rows")?;
            let dimension = index
                .dimension()
                .await
                .context("Failed to read index dimension")?;
            println!("   ✅ Movies: {}", rows);
            println!("   🔢 Dimension: {}", dimension);

            match IndexManifest::read(&artifact_dir) {
                Ok(Some(manifest)) => {
                    println!("   📋 Built with: {}", manifest.model);
                    println!("   🕒 Built at: {}", manifest.built_at.to_rfc3339());
                    if manifest.model != config.ollama.model {
                        println!(
                            "   {} Configured model is {}; rebuild to match",
                            style("⚠️").yellow(),
                            config.ollama.model
                        );
                    }
                }
                Ok(None) => println!("   ⚠️  No manifest found"),
                Err(e) => {
                    warn!("Unreadable manifest: {}", e);
                    println!("   ⚠️  Manifest unreadable - {}", e);
                }
            }
        }
        Err(CinemateError::NotFound { .. }) => {
            println!("   ❌ Not built yet. Run `cinemate build`.");
        }
        Err(e) => println!("   ❌ Failed to open index - {}", e),
    }

    Ok(())
}
