//! Error types for cardsync

use thiserror::Error;

use crate::model::ItemKind;

/// Result type alias for cardsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cardsync operations
///
/// Every variant is terminal for a sync run; nothing is retried or skipped.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport or API failure reported by the board gateway
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A board item carries more field values than a single page holds
    #[error("board item {item} has more than {limit} field values, which is not supported")]
    TooManyFields {
        /// Board item id
        item: String,
        /// Page size the snapshot was fetched with
        limit: usize,
    },

    /// Configured field name is absent from the board schema
    #[error("project does not have a field named: {field}")]
    UnknownField {
        /// Configured field name
        field: String,
    },

    /// Option name is absent from a single-select field
    #[error("project field: {field} does not have an option: {option}")]
    UnknownOption {
        /// Field the option was looked up in
        field: String,
        /// Option name that was not found
        option: String,
    },

    /// Rule type not in the recognized set
    #[error(
        "unsupported field type: {rule} (expected one of draft, changes, author, \
         last_activity, default_single_select, single_select, type)"
    )]
    UnsupportedRule {
        /// Rule type as written in the configuration
        rule: String,
    },

    /// Listing the open items of a repository failed
    #[error("failed to list open items for: {repository} got: {source}")]
    Repository {
        /// Repository as written in the configuration
        repository: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Processing a single tracked item failed
    #[error("failed to process {kind}: {url} got: {source}")]
    Item {
        /// Pull request or issue
        kind: ItemKind,
        /// Item URL
        url: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Linking an item to the board failed
    #[error("failed to add project item got: {source}")]
    AddItem {
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Writing one field of a board item failed
    #[error("failed to update project item field: {field} got: {source}")]
    UpdateField {
        /// Board field name
        field: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Credential lookup or setup failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Strip operation context and return the underlying error kind
    pub fn root(&self) -> &Error {
        match self {
            Error::Repository { source, .. }
            | Error::Item { source, .. }
            | Error::AddItem { source }
            | Error::UpdateField { source, .. } => source.root(),
            other => other,
        }
    }
}
