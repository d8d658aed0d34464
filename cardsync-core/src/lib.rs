//! Cardsync Core - project board synchronization for open pull requests and issues
//!
//! This crate holds the board model, the sync configuration and the field
//! reconciliation engine. Talking to GitHub is left to a [`BoardGateway`]
//! implementation.

pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod model;
pub mod sync;
pub mod vendor;

pub use config::{Config, FieldRule, ProjectRef, RepoRef, RepositoryConfig, RuleType};
pub use credentials::{Credentials, Secrets};
pub use error::{Error, Result};
pub use gateway::BoardGateway;
pub use model::{
    Board, BoardField, BoardItem, ChangedFile, FieldKind, FieldOption, FieldUpdate, FieldValue,
    FieldValueData, ItemDetails, ItemKind, PullRequestDetails, TrackedItem,
};
pub use sync::{resolve_field_value, NoopReporter, SyncReporter, SyncSummary, Synchronizer};
