//! Board gateway abstraction
//!
//! The reconciliation engine only talks to the board through this trait.
//! Implementations own pagination, authentication and upstream schema
//! differences.

use async_trait::async_trait;

use crate::config::{ProjectRef, RepoRef};
use crate::model::{Board, BoardItem, FieldUpdate, ItemKind, TrackedItem};
use crate::Result;

/// Typed operations against a project board
#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Fetch the board id and its complete field schema
    async fn fetch_board(&self, project: &ProjectRef) -> Result<Board>;

    /// List every open pull request or issue of a repository, in upstream order
    async fn list_open_items(&self, repo: &RepoRef, kind: ItemKind) -> Result<Vec<TrackedItem>>;

    /// Link a tracked item to the board, returning the board item and its field values
    ///
    /// Adding an item that is already on the board returns the existing item.
    async fn add_item(&self, board_id: &str, content_id: &str) -> Result<BoardItem>;

    /// Write one field value on a board item
    async fn update_item_field(
        &self,
        board_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldUpdate,
    ) -> Result<()>;
}
