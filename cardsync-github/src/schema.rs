//! Upstream shapes and their normalization into the board model
//!
//! GitHub has served project fields and item values in more than one shape
//! over time. Everything that depends on those shapes lives here; callers
//! only see [`BoardField`], [`FieldValue`] and [`TrackedItem`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use cardsync_core::{
    BoardField, ChangedFile, FieldKind, FieldOption, FieldValue, FieldValueData, ItemDetails,
    PullRequestDetails, TrackedItem,
};

use crate::pagination::Connection;

/// Login GitHub shows for deleted accounts
const GHOST_LOGIN: &str = "ghost";

/// A project field node in any supported shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawField {
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<FieldOption>>,
    /// Older schema: JSON document with an `options` array
    #[serde(default)]
    pub settings: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacySettings {
    #[serde(default)]
    options: Vec<FieldOption>,
}

impl RawField {
    /// Map into a [`BoardField`]; nodes without id or name are dropped
    pub fn normalize(self) -> Option<BoardField> {
        let (id, name) = match (self.id, self.name) {
            (Some(id), Some(name)) => (id, name),
            _ => {
                debug!(typename = ?self.typename, "Skipping project field without id or name");
                return None;
            }
        };

        let kind = match self.data_type.as_deref() {
            Some(data_type) => kind_from_data_type(data_type, self.options),
            None => kind_from_legacy(self.options, self.settings.as_deref()),
        };

        Some(BoardField { id, name, kind })
    }
}

fn kind_from_data_type(data_type: &str, options: Option<Vec<FieldOption>>) -> FieldKind {
    match data_type {
        "TEXT" => FieldKind::Text,
        "NUMBER" => FieldKind::Number,
        "DATE" => FieldKind::Date,
        "ITERATION" => FieldKind::Iteration,
        "SINGLE_SELECT" => FieldKind::SingleSelect {
            options: options.unwrap_or_default(),
        },
        other => FieldKind::Other(other.to_ascii_lowercase()),
    }
}

fn kind_from_legacy(options: Option<Vec<FieldOption>>, settings: Option<&str>) -> FieldKind {
    if let Some(options) = options {
        return FieldKind::SingleSelect { options };
    }

    let settings: LegacySettings = settings
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    if settings.options.is_empty() {
        FieldKind::Other("unknown".to_string())
    } else {
        FieldKind::SingleSelect {
            options: settings.options,
        }
    }
}

/// Field reference embedded in a value node
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFieldRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A board item value node in any supported shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFieldValue {
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
    #[serde(default)]
    pub field: Option<RawFieldRef>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub number: Option<f64>,
    #[serde(default)]
    pub option_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Older schema: field reference plus a raw string value
    #[serde(default)]
    pub project_field: Option<RawFieldRef>,
    #[serde(default)]
    pub value: Option<String>,
}

impl RawFieldValue {
    pub fn normalize(self) -> FieldValue {
        if let Some(field) = self.project_field {
            return FieldValue {
                field_id: field.id.unwrap_or_default(),
                field_name: field.name.unwrap_or_default(),
                data: FieldValueData::Text(self.value.unwrap_or_default()),
            };
        }

        let field = self.field.unwrap_or_default();
        let data = match self.typename.as_deref() {
            Some("ProjectV2ItemFieldTextValue") => {
                FieldValueData::Text(self.text.unwrap_or_default())
            }
            Some("ProjectV2ItemFieldDateValue") => {
                FieldValueData::Date(self.date.unwrap_or_default())
            }
            Some("ProjectV2ItemFieldNumberValue") => match self.number {
                Some(number) => FieldValueData::Number(number),
                None => FieldValueData::Other,
            },
            Some("ProjectV2ItemFieldSingleSelectValue") => FieldValueData::SingleSelect {
                option_id: self.option_id.unwrap_or_default(),
                name: self.name.unwrap_or_default(),
            },
            _ => FieldValueData::Other,
        };

        FieldValue {
            field_id: field.id.unwrap_or_default(),
            field_name: field.name.unwrap_or_default(),
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawActor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTimeline {
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFile {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

impl From<RawFile> for ChangedFile {
    fn from(file: RawFile) -> Self {
        ChangedFile::new(file.path, file.additions, file.deletions)
    }
}

/// Open pull request node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPullRequest {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub is_draft: bool,
    pub author: Option<RawActor>,
    pub timeline_items: RawTimeline,
    #[serde(default)]
    pub files: Option<Connection<RawFile>>,
}

impl RawPullRequest {
    /// Cursor to continue the file list from, if the first page was not the last
    pub fn files_continuation(&self) -> Option<String> {
        self.files
            .as_ref()
            .filter(|f| f.page_info.has_next_page)
            .and_then(|f| f.page_info.end_cursor.clone())
    }

    /// Build the tracked item; `extra_files` are the pages after the first
    pub fn normalize(self, extra_files: Vec<RawFile>) -> TrackedItem {
        let mut files: Vec<ChangedFile> = self
            .files
            .map(|f| f.into_nodes())
            .unwrap_or_default()
            .into_iter()
            .map(ChangedFile::from)
            .collect();
        files.extend(extra_files.into_iter().map(ChangedFile::from));

        TrackedItem {
            id: self.id,
            url: self.url,
            author: login_of(self.author),
            last_activity: self.timeline_items.updated_at,
            details: ItemDetails::PullRequest(PullRequestDetails {
                is_draft: self.is_draft,
                files,
            }),
        }
    }
}

/// Open issue node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIssue {
    pub id: String,
    pub url: String,
    pub author: Option<RawActor>,
    pub timeline_items: RawTimeline,
}

impl From<RawIssue> for TrackedItem {
    fn from(issue: RawIssue) -> Self {
        TrackedItem {
            id: issue.id,
            url: issue.url,
            author: login_of(issue.author),
            last_activity: issue.timeline_items.updated_at,
            details: ItemDetails::Issue,
        }
    }
}

fn login_of(actor: Option<RawActor>) -> String {
    actor
        .map(|a| a.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}
