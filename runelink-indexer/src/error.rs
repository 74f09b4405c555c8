use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    /// Transport failure or timeout before any HTTP status was received.
    #[error("Indexer unavailable: {0}")]
    Unavailable(String),

    #[error("Indexer returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The request succeeded but the payload carried a non-zero `code`.
    #[error("Indexer error {code}: {message}")]
    Logical { code: i64, message: String },

    #[error("Failed to parse indexer response: {0}")]
    Parse(String),

    #[error("Invalid indexer configuration: {0}")]
    Configuration(String),
}

impl IndexerError {
    /// `true` when the indexer could not be reached or answered with a non-2xx status.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            IndexerError::Unavailable(_) | IndexerError::HttpStatus { .. }
        )
    }
}

impl From<reqwest::Error> for IndexerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IndexerError::Parse(err.to_string())
        } else {
            IndexerError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(err: serde_json::Error) -> Self {
        IndexerError::Parse(err.to_string())
    }
}
