//! Error types for availarr.
//!
//! The taxonomy is small on purpose: upstream trouble (either API being
//! unreachable, rate-limited, or returning garbage), a lookup that found
//! nothing, and bad configuration. Callers branch on the variant to decide
//! whether a failure aborts the run or only the current movie.

/// Error type shared by the Radarr and TMDB clients and the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An upstream API was unreachable, rate-limited past retry, or returned
    /// a malformed or error response.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// The requested item has no data upstream (e.g. TMDB knows nothing
    /// about a movie's availability). Not fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a new Upstream error.
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
