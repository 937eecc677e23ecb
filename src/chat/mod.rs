// Chat module
// The interactive recommendation loop and how results are presented


pub mod narrator;

use async_trait::async_trait;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::dataset::MovieRecord;
use crate::embeddings::Embedder;
use crate::retriever::{Recommendation, Retriever};
use crate::Result;

pub use narrator::{Narrator, OllamaNarrator, narration_prompt};

pub const WELCOME: &str = "🎥 Welcome to CineMate! Type 'exit' to quit.";
pub const PROMPT: &str = "\n🔍 Ask for a movie recommendation: ";
pub const GOODBYE: &str = "👋 Goodbye!";
pub const NO_MATCHES: &str = "⚠️ No matching movies found. Try a different query!";
pub const LISTING_HEADER: &str = "\n🎬 Recommended Movies:";

const SEPARATOR_WIDTH: usize = 50;

/// Anything that can turn a free-text query into ranked movies
#[async_trait]
pub trait MovieSearch: Send + Sync {
    async fn recommend(&self, query: &str, top_k: usize) -> Result<Vec<Recommendation>>;
}

#[async_trait]
impl<E: Embedder> MovieSearch for Retriever<E> {
    #[inline]
    async fn recommend(&self, query: &str, top_k: usize) -> Result<Vec<Recommendation>> {
        self.search(query, top_k).await
    }
}

/// How recommendations are shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PresentationMode {
    /// Every match, rendered with the fixed card template
    #[default]
    Listing,
    /// The single best match, described by a generative model
    Narrated,
}

impl fmt::Display for PresentationMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => f.write_str("listing"),
            Self::Narrated => f.write_str("narrated"),
        }
    }
}

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Exit,
    Query(String),
}

/// `exit` and `quit` end the session regardless of case or surrounding
/// whitespace. Everything else, the empty line included, is a query.
#[inline]
pub fn parse_input(line: &str) -> ChatInput {
    let command = line.trim();
    if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
        ChatInput::Exit
    } else {
        ChatInput::Query(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// The four-line card shown for each recommended movie
#[inline]
pub fn format_recommendation(movie: &MovieRecord) -> String {
    format!(
        "🎬 *{}* ({}) is a *{}* movie from {}.\n\
         🎥 Directed by {}, starring {}.\n\
         🏆 {}.\n\
         ⭐ IMDb Rating: {} (based on {} votes).",
        movie.display_title(),
        movie.display_year(),
        movie.display_genre(),
        movie.display_country(),
        movie.display_director(),
        movie.display_actors(),
        movie.display_awards(),
        movie.display_rating(),
        movie.display_votes(),
    )
}

fn separator() -> String {
    format!("\n{}", "-".repeat(SEPARATOR_WIDTH))
}

pub struct ChatSession<S> {
    search: S,
    top_k: usize,
    narrator: Option<Box<dyn Narrator>>,
}

impl<S: MovieSearch> ChatSession<S> {
    /// A listing session returning up to `top_k` movies per query
    #[inline]
    pub fn new(search: S, top_k: usize) -> Self {
        Self {
            search,
            top_k,
            narrator: None,
        }
    }

    /// Switch to narrated presentation
    #[inline]
    pub fn with_narrator(mut self, narrator: Box<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    #[inline]
    pub fn mode(&self) -> PresentationMode {
        if self.narrator.is_some() {
            PresentationMode::Narrated
        } else {
            PresentationMode::Listing
        }
    }

    /// Run the conversation until the user exits or input ends.
    ///
    /// A query that fails, or a line that is not valid UTF-8, is reported on
    /// `output` and the loop keeps going. Any other I/O failure on `input` or
    /// `output` ends the session with an error.
    #[inline]
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: BufRead + Send,
        W: Write + Send,
    {
        writeln!(output, "{WELCOME}")?;

        let mut lines = input.lines();
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let Some(line) = lines.next() else {
                debug!("Input closed, ending chat session");
                writeln!(output)?;
                writeln!(output, "{GOODBYE}")?;
                break;
            };

            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    warn!("Skipping unreadable input line: {}", e);
                    writeln!(output, "❌ Could not read that line: {e}")?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match parse_input(&line) {
                ChatInput::Exit => {
                    writeln!(output, "{GOODBYE}")?;
                    break;
                }
                ChatInput::Query(query) => {
                    if let Err(e) = self.respond(&query, &mut output).await {
                        warn!("Query {:?} failed: {}", query, e);
                        writeln!(output, "❌ {e}")?;
                    }
                }
            }
        }

        output.flush()?;
        Ok(())
    }

    /// Answer a single query
    #[inline]
    pub async fn respond<W: Write + Send>(&self, query: &str, output: &mut W) -> Result<()> {
        let top_k = match self.mode() {
            PresentationMode::Listing => self.top_k,
            PresentationMode::Narrated => 1,
        };

        let recommendations = self.search.recommend(query, top_k).await?;

        if recommendations.is_empty() {
            writeln!(output, "{NO_MATCHES}")?;
            return Ok(());
        }

        match &self.narrator {
            None => {
                writeln!(output, "{LISTING_HEADER}")?;
                for recommendation in &recommendations {
                    writeln!(output, "{}", format_recommendation(&recommendation.movie))?;
                    writeln!(output, "{}", separator())?;
                }
            }
            Some(narrator) => {
                let best = &recommendations[0].movie;
                let blurb = narrator.narrate(query, best)?;
                writeln!(
                    output,
                    "\n🎬 *{}* ({})",
                    best.display_title(),
                    best.display_year()
                )?;
                writeln!(output, "{blurb}")?;
                writeln!(output, "{}", separator())?;
            }
        }

        Ok(())
    }
}
