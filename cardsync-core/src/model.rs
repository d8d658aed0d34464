//! Board and tracked-item model
//!
//! These types are the stable shape the reconciliation engine works with.
//! The gateway maps every upstream schema variant onto them before they
//! leave the GitHub crate.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::vendor::is_vendored;

/// A project board with its field schema
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Board node id
    pub id: String,
    /// Board title
    pub title: String,
    /// Fields in board order
    pub fields: Vec<BoardField>,
}

impl Board {
    /// Find the first field with exactly this name
    pub fn find_field_by_name(&self, name: &str) -> Option<&BoardField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single field of a board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardField {
    /// Field node id
    pub id: String,
    /// Field name as shown on the board
    pub name: String,
    /// What kind of values the field holds
    pub kind: FieldKind,
}

impl BoardField {
    /// Options of a single-select field, empty for every other kind
    pub fn options(&self) -> &[FieldOption] {
        match &self.kind {
            FieldKind::SingleSelect { options } => options,
            _ => &[],
        }
    }

    /// Find the first option with exactly this name
    pub fn find_option_by_name(&self, name: &str) -> Option<&FieldOption> {
        self.options().iter().find(|o| o.name == name)
    }
}

/// Field kinds known to the board
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Iteration,
    SingleSelect { options: Vec<FieldOption> },
    /// Built-in or future field types (title, assignees, labels, ...)
    Other(String),
}

impl FieldKind {
    /// Short human-readable name
    pub fn label(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Iteration => "iteration",
            FieldKind::SingleSelect { .. } => "single select",
            FieldKind::Other(name) => name,
        }
    }
}

/// Option of a single-select field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

/// A tracked item linked to the board, with its current field values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardItem {
    /// Board item node id
    pub id: String,
    /// Snapshot of the values currently set on the item
    pub field_values: Vec<FieldValue>,
}

impl BoardItem {
    /// Current value for a board field, matched by field id and then by name
    pub fn value_for(&self, field: &BoardField) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|v| !v.field_id.is_empty() && v.field_id == field.id)
            .or_else(|| self.field_values.iter().find(|v| v.field_name == field.name))
    }
}

/// A value currently set on a board item
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field_id: String,
    pub field_name: String,
    pub data: FieldValueData,
}

/// Typed content of a field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValueData {
    Text(String),
    Date(String),
    Number(f64),
    SingleSelect { option_id: String, name: String },
    /// Value kinds the engine never reads (labels, iterations, ...)
    Other,
}

impl FieldValueData {
    /// Whether the value counts as "already set"
    ///
    /// A single-select value is set when either its option id or its option
    /// name is non-empty, so an option that upstream reports with an empty id
    /// is still recognised.
    pub fn is_set(&self) -> bool {
        match self {
            FieldValueData::Text(text) | FieldValueData::Date(text) => !text.is_empty(),
            FieldValueData::Number(_) => true,
            FieldValueData::SingleSelect { option_id, name } => {
                !option_id.is_empty() || !name.is_empty()
            }
            FieldValueData::Other => true,
        }
    }
}

/// A value to write into one field of a board item
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    SingleSelectOption(String),
}

/// Kind of tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    PullRequest,
    Issue,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::PullRequest => write!(f, "pull request"),
            ItemKind::Issue => write!(f, "issue"),
        }
    }
}

/// An open pull request or issue from a repository
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    /// Content node id used to link the item to the board
    pub id: String,
    pub url: String,
    /// Author login
    pub author: String,
    /// When the item's timeline was last updated
    pub last_activity: DateTime<Utc>,
    pub details: ItemDetails,
}

/// Kind-specific attributes
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDetails {
    PullRequest(PullRequestDetails),
    Issue,
}

impl TrackedItem {
    pub fn kind(&self) -> ItemKind {
        match self.details {
            ItemDetails::PullRequest(_) => ItemKind::PullRequest,
            ItemDetails::Issue => ItemKind::Issue,
        }
    }

    /// Draft flag, only available for pull requests
    pub fn is_draft(&self) -> Option<bool> {
        match &self.details {
            ItemDetails::PullRequest(pr) => Some(pr.is_draft),
            ItemDetails::Issue => None,
        }
    }

    /// Changed line count, only available for pull requests
    pub fn changes(&self) -> Option<u64> {
        match &self.details {
            ItemDetails::PullRequest(pr) => Some(pr.changes()),
            ItemDetails::Issue => None,
        }
    }

    /// Option name the `type` rule selects for this item
    pub fn type_option_name(&self) -> &'static str {
        match self.kind() {
            ItemKind::PullRequest => "Pull Request",
            ItemKind::Issue => "Issue",
        }
    }
}

/// Pull-request-only attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullRequestDetails {
    pub is_draft: bool,
    pub files: Vec<ChangedFile>,
}

impl PullRequestDetails {
    /// Additions plus deletions over all non-vendored files
    pub fn changes(&self) -> u64 {
        self.files
            .iter()
            .filter(|f| !is_vendored(&f.path))
            .map(|f| f.additions + f.deletions)
            .sum()
    }
}

/// Per-file diff statistics of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, additions: u64, deletions: u64) -> Self {
        Self {
            path: path.into(),
            additions,
            deletions,
        }
    }
}
