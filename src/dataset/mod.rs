//! Movie dataset ingestion
//!
//! Reads the CSV produced by the data-collection step (one row per movie) into
//! [`MovieRecord`]s. Ingestion is deliberately permissive: empty cells, missing
//! columns and unparsable numbers all become `None` instead of failing the load.

#[cfg(test)]
mod tests;

use std::fmt::Display;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::{CinemateError, Result};

/// One movie row. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieRecord {
    /// IMDb identifier, e.g. `tt0133093`
    pub tconst: Option<String>,
    pub title: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub rating: Option<f32>,
    #[serde(deserialize_with = "deserialize_votes")]
    pub votes: Option<u64>,
}

impl MovieRecord {
    /// Text fed to the embedding model. Missing fields render as empty strings.
    #[inline]
    pub fn embedding_text(&self) -> String {
        format!(
            "Plot: {}. Genre: {}. Director: {}. Actors: {}",
            text_or_empty(self.plot.as_deref()),
            text_or_empty(self.genre.as_deref()),
            text_or_empty(self.director.as_deref()),
            text_or_empty(self.actors.as_deref()),
        )
    }

    #[inline]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown Title")
    }

    #[inline]
    pub fn display_year(&self) -> String {
        display_or(self.year, "Unknown Year")
    }

    #[inline]
    pub fn display_genre(&self) -> &str {
        self.genre.as_deref().unwrap_or("Unknown Genre")
    }

    #[inline]
    pub fn display_director(&self) -> &str {
        self.director.as_deref().unwrap_or("Unknown Director")
    }

    #[inline]
    pub fn display_actors(&self) -> &str {
        self.actors.as_deref().unwrap_or("Unknown Actors")
    }

    #[inline]
    pub fn display_country(&self) -> &str {
        self.country.as_deref().unwrap_or("Unknown Country")
    }

    #[inline]
    pub fn display_awards(&self) -> &str {
        self.awards
            .as_deref()
            .unwrap_or("No awards information available")
    }

    #[inline]
    pub fn display_rating(&self) -> String {
        display_or(self.rating, "N/A")
    }

    #[inline]
    pub fn display_votes(&self) -> String {
        display_or(self.votes, "N/A")
    }
}

fn text_or_empty(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

fn display_or<T: Display>(value: Option<T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), |v| v.to_string())
}

/// Accepts `1234`, `1,234` and empty cells; anything else becomes `None`.
fn deserialize_votes<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let digits: String = value.chars().filter(|c| *c != ',').collect();
        digits.trim().parse().ok()
    }))
}

/// Load every movie in the CSV at `dataset_path`, in file order.
#[inline]
pub fn load_movie_dataset<P: AsRef<Path>>(dataset_path: P) -> Result<Vec<MovieRecord>> {
    let path = dataset_path.as_ref();
    if !path.exists() {
        return Err(CinemateError::not_found(
            path,
            "The movie dataset file does not exist.",
        ));
    }

    debug!("Reading movie dataset from {}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_path(path)
        .map_err(|e| CinemateError::Dataset(format!("Failed to open CSV: {}", e)))?;

    let mut movies = Vec::new();
    for (row, record) in reader.deserialize::<MovieRecord>().enumerate() {
        let movie = record.map_err(|e| {
            let line = e
                .position()
                .map_or_else(|| format!("row {}", row + 1), |p| format!("line {}", p.line()));
            CinemateError::Dataset(format!("Malformed record at {}: {}", line, e))
        })?;
        movies.push(movie);
    }

    info!("Loaded {} movies from {}", movies.len(), path.display());
    Ok(movies)
}
