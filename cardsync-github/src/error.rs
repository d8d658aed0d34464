//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// HTTP transport error
    #[error("GraphQL request failed: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("GraphQL request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Errors reported in the GraphQL response body
    #[error("GraphQL errors: {}", .0.join(", "))]
    GraphQl(Vec<String>),

    /// Requested project or repository does not exist or is not accessible
    #[error("{0} not found or not accessible")]
    NotFound(String),

    /// Board item returned more field values than fit on one page
    #[error("board item {item} has more than {limit} field values, which is not supported")]
    TooManyFieldValues { item: String, limit: usize },

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<Error> for cardsync_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::TooManyFieldValues { item, limit } => {
                cardsync_core::Error::TooManyFields { item, limit }
            }
            Error::Auth(msg) => cardsync_core::Error::Auth(msg),
            other => cardsync_core::Error::Upstream(other.to_string()),
        }
    }
}
