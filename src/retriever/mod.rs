//! Semantic movie search over a persisted index
//!
//! A [`Retriever`] only exists once its artifact has been opened and its
//! metadata loaded, so every method can assume a ready index.


use std::path::Path;

use tracing::{debug, info, warn};

use crate::dataset::MovieRecord;
use crate::embeddings::Embedder;
use crate::index::{IndexHit, IndexManifest, MovieIndex};
use crate::{CinemateError, Result};

/// A search hit resolved against the metadata table
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub movie: MovieRecord,
    /// Row position in the index
    pub position: usize,
    /// Squared L2 distance to the query, smaller is closer
    pub distance: f32,
}

pub struct Retriever<E> {
    embedder: E,
    index: MovieIndex,
    metadata: Vec<MovieRecord>,
    dimension: usize,
    manifest: Option<IndexManifest>,
}

impl<E: Embedder> Retriever<E> {
    /// Open the artifact at `artifact_dir` and load its metadata into memory
    #[inline]
    pub async fn load(artifact_dir: &Path, embedder: E) -> Result<Self> {
        let index = MovieIndex::open(artifact_dir).await?;
        let dimension = index.dimension().await?;
        let metadata = index.load_metadata().await?;
        let manifest = IndexManifest::read(artifact_dir)?;

        match &manifest {
            Some(manifest) if manifest.model != embedder.model_name() => {
                warn!(
                    "Index at {} was built with model '{}' but queries use '{}'; results may be meaningless",
                    artifact_dir.display(),
                    manifest.model,
                    embedder.model_name()
                );
            }
            Some(_) => {}
            None => warn!(
                "No manifest found next to {}; cannot verify the embedding model",
                artifact_dir.display()
            ),
        }

        info!(
            "Loaded {} movies ({}-d) from {}",
            metadata.len(),
            dimension,
            artifact_dir.display()
        );

        Ok(Self {
            embedder,
            index,
            metadata,
            dimension,
            manifest,
        })
    }

    /// The `top_k` closest movies to `query`, closest first.
    ///
    /// `top_k` larger than the corpus returns the whole corpus.
    #[inline]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Recommendation>> {
        if top_k == 0 {
            return Err(CinemateError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }

        if self.metadata.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query)?;
        if query_vector.len() != self.dimension {
            return Err(CinemateError::DimensionMismatch {
                row: 0,
                expected: self.dimension,
                found: query_vector.len(),
            });
        }

        let limit = top_k.min(self.metadata.len());
        debug!("Searching for {:?} with limit {}", query, limit);

        let hits = self.index.search(&query_vector, limit).await?;
        Ok(resolve(hits, &self.metadata))
    }

    /// The single closest movie, if any
    #[inline]
    pub async fn search_one(&self, query: &str) -> Result<Option<Recommendation>> {
        Ok(self.search(query, 1).await?.into_iter().next())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}

/// Map raw hits onto metadata rows. Hits pointing past the table are dropped.
#[inline]
pub fn resolve(hits: Vec<IndexHit>, metadata: &[MovieRecord]) -> Vec<Recommendation> {
    hits.into_iter()
        .filter_map(|hit| match metadata.get(hit.position) {
            Some(movie) => Some(Recommendation {
                movie: movie.clone(),
                position: hit.position,
                distance: hit.distance,
            }),
            None => {
                warn!(
                    "Dropping hit at position {} outside metadata of {} rows",
                    hit.position,
                    metadata.len()
                );
                None
            }
        })
        .collect()
}
