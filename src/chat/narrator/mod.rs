
use tracing::debug;

use crate::dataset::MovieRecord;
use crate::embeddings::OllamaClient;
use crate::Result;

/// Produces a short conversational blurb about one movie
pub trait Narrator: Send + Sync {
    fn narrate(&self, query: &str, movie: &MovieRecord) -> Result<String>;
}

/// Narrator backed by an Ollama generative model
#[derive(Debug, Clone)]
pub struct OllamaNarrator {
    client: OllamaClient,
}

impl OllamaNarrator {
    /// `client` must already point at the generative model
    #[inline]
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    #[inline]
    pub fn model(&self) -> &str {
        self.client.model()
    }
}

impl Narrator for OllamaNarrator {
    #[inline]
    fn narrate(&self, query: &str, movie: &MovieRecord) -> Result<String> {
        debug!(
            "Narrating '{}' with {}",
            movie.display_title(),
            self.client.model()
        );
        self.client.generate(&narration_prompt(query, movie))
    }
}

/// Prompt asking for a brief recommendation grounded in the movie's own plot
#[inline]
pub fn narration_prompt(query: &str, movie: &MovieRecord) -> String {
    format!(
        "You are CineMate, a friendly movie expert. A user asked: \"{query}\".\n\
         Recommend the movie \"{title}\" ({year}) in two or three sentences, \
         explaining why it fits the request. Only use the facts below.\n\
         Genre: {genre}\nDirector: {director}\nStarring: {actors}\nPlot: {plot}",
        title = movie.display_title(),
        year = movie.display_year(),
        genre = movie.display_genre(),
        director = movie.display_director(),
        actors = movie.display_actors(),
        plot = movie.plot.as_deref().unwrap_or("No description available"),
    )
}
