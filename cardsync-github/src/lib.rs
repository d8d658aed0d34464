//! Cardsync GitHub - Projects board gateway for cardsync
//!
//! This crate implements [`cardsync_core::BoardGateway`] on top of GitHub's
//! GraphQL API: field schema, open pull requests and issues, adding items to
//! a project and writing item field values.

mod board;
mod error;
mod pagination;
mod schema;
mod transport;

pub use board::GitHubBoard;
pub use error::{Error, Result};
pub use pagination::PAGE_SIZE;
pub use transport::{AppTransport, GraphQlTransport, HttpTransport};
