//! Projects (v2) board gateway

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use cardsync_core::{
    Board, BoardField, BoardGateway, BoardItem, FieldUpdate, ItemKind, ProjectRef, RepoRef,
    TrackedItem,
};

use crate::pagination::{paginate, Connection, PAGE_SIZE};
use crate::schema::{RawField, RawFieldValue, RawFile, RawIssue, RawPullRequest};
use crate::transport::GraphQlTransport;
use crate::{Error, Result};

const PROJECT_FIELDS_QUERY: &str = r#"
    query($organization: String!, $number: Int!, $first: Int!, $cursor: String) {
        organization(login: $organization) {
            projectV2(number: $number) {
                id
                title
                fields(first: $first, after: $cursor) {
                    nodes {
                        __typename
                        ... on ProjectV2Field { id name dataType }
                        ... on ProjectV2IterationField { id name dataType }
                        ... on ProjectV2SingleSelectField {
                            id
                            name
                            dataType
                            options { id name }
                        }
                    }
                    pageInfo { endCursor hasNextPage }
                }
            }
        }
    }
"#;

const OPEN_PULL_REQUESTS_QUERY: &str = r#"
    query($owner: String!, $name: String!, $first: Int!, $cursor: String) {
        repository(owner: $owner, name: $name) {
            items: pullRequests(first: $first, after: $cursor, states: [OPEN]) {
                nodes {
                    id
                    url
                    isDraft
                    author { login }
                    timelineItems { updatedAt }
                    files(first: $first) {
                        nodes { path additions deletions }
                        pageInfo { endCursor hasNextPage }
                    }
                }
                pageInfo { endCursor hasNextPage }
            }
        }
    }
"#;

const OPEN_ISSUES_QUERY: &str = r#"
    query($owner: String!, $name: String!, $first: Int!, $cursor: String) {
        repository(owner: $owner, name: $name) {
            items: issues(first: $first, after: $cursor, states: [OPEN]) {
                nodes {
                    id
                    url
                    author { login }
                    timelineItems { updatedAt }
                }
                pageInfo { endCursor hasNextPage }
            }
        }
    }
"#;

const PULL_REQUEST_FILES_QUERY: &str = r#"
    query($id: ID!, $first: Int!, $cursor: String) {
        node(id: $id) {
            ... on PullRequest {
                files(first: $first, after: $cursor) {
                    nodes { path additions deletions }
                    pageInfo { endCursor hasNextPage }
                }
            }
        }
    }
"#;

const ADD_ITEM_MUTATION: &str = r#"
    mutation($input: AddProjectV2ItemByIdInput!, $first: Int!) {
        addProjectV2ItemById(input: $input) {
            item {
                id
                fieldValues(first: $first) {
                    nodes {
                        __typename
                        ... on ProjectV2ItemFieldTextValue {
                            text
                            field { ... on ProjectV2FieldCommon { id name } }
                        }
                        ... on ProjectV2ItemFieldDateValue {
                            date
                            field { ... on ProjectV2FieldCommon { id name } }
                        }
                        ... on ProjectV2ItemFieldNumberValue {
                            number
                            field { ... on ProjectV2FieldCommon { id name } }
                        }
                        ... on ProjectV2ItemFieldSingleSelectValue {
                            optionId
                            name
                            field { ... on ProjectV2FieldCommon { id name } }
                        }
                    }
                    pageInfo { endCursor hasNextPage }
                }
            }
        }
    }
"#;

const UPDATE_FIELD_MUTATION: &str = r#"
    mutation($input: UpdateProjectV2ItemFieldValueInput!) {
        updateProjectV2ItemFieldValue(input: $input) {
            clientMutationId
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct OrganizationData {
    organization: Option<ProjectData>,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    #[serde(rename = "projectV2")]
    project: Option<ProjectFields>,
}

#[derive(Debug, Deserialize)]
struct ProjectFields {
    id: String,
    #[serde(default)]
    title: String,
    fields: Connection<RawField>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<RepositoryItems<T>>,
}

#[derive(Debug, Deserialize)]
struct RepositoryItems<T> {
    items: Connection<T>,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    node: Option<FilesNode>,
}

#[derive(Debug, Deserialize)]
struct FilesNode {
    files: Option<Connection<RawFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemData {
    add_project_v2_item_by_id: AddItemPayload,
}

#[derive(Debug, Deserialize)]
struct AddItemPayload {
    item: Option<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    field_values: Connection<RawFieldValue>,
}

/// Board gateway backed by GitHub's GraphQL API
pub struct GitHubBoard {
    transport: Box<dyn GraphQlTransport>,
}

impl GitHubBoard {
    pub fn new(transport: Box<dyn GraphQlTransport>) -> Self {
        Self { transport }
    }

    async fn board(&self, project: &ProjectRef) -> Result<Board> {
        debug!(project = %project, "Fetching project fields");

        let mut header: Option<(String, String)> = None;
        let fields = paginate(
            self.transport.as_ref(),
            PROJECT_FIELDS_QUERY,
            json!({
                "organization": project.organization,
                "number": project.number,
            }),
            None,
            |data| {
                let data: OrganizationData = serde_json::from_value(data)?;
                let fields = data
                    .organization
                    .and_then(|o| o.project)
                    .ok_or_else(|| Error::NotFound(format!("project {}", project)))?;
                header = Some((fields.id, fields.title));
                Ok(fields.fields)
            },
        )
        .await?;

        let (id, title) = header.ok_or_else(|| Error::NotFound(format!("project {}", project)))?;
        let fields: Vec<BoardField> = fields.into_iter().filter_map(RawField::normalize).collect();

        info!(project = %project, fields = fields.len(), "Loaded project");

        Ok(Board { id, title, fields })
    }

    async fn open_items<T>(&self, repo: &RepoRef, query: &str) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        paginate(
            self.transport.as_ref(),
            query,
            json!({
                "owner": repo.owner,
                "name": repo.name,
            }),
            None,
            |data| {
                let data: RepositoryData<T> = serde_json::from_value(data)?;
                data.repository
                    .map(|r| r.items)
                    .ok_or_else(|| Error::NotFound(format!("repository {}", repo)))
            },
        )
        .await
    }

    async fn open_pull_requests(&self, repo: &RepoRef) -> Result<Vec<TrackedItem>> {
        let raw: Vec<RawPullRequest> = self.open_items(repo, OPEN_PULL_REQUESTS_QUERY).await?;

        let mut items = Vec::with_capacity(raw.len());
        for pr in raw {
            let extra_files = match pr.files_continuation() {
                Some(cursor) => self.remaining_files(&pr.id, cursor).await?,
                None => Vec::new(),
            };
            items.push(pr.normalize(extra_files));
        }

        Ok(items)
    }

    async fn remaining_files(&self, pull_request_id: &str, cursor: String) -> Result<Vec<RawFile>> {
        debug!(pull_request_id, "Fetching remaining pull request files");

        paginate(
            self.transport.as_ref(),
            PULL_REQUEST_FILES_QUERY,
            json!({ "id": pull_request_id }),
            Some(cursor),
            |data| {
                let data: NodeData = serde_json::from_value(data)?;
                data.node
                    .and_then(|n| n.files)
                    .ok_or_else(|| Error::NotFound(format!("pull request {}", pull_request_id)))
            },
        )
        .await
    }

    async fn add(&self, board_id: &str, content_id: &str) -> Result<BoardItem> {
        let data = self
            .transport
            .execute(
                ADD_ITEM_MUTATION,
                &json!({
                    "input": {
                        "projectId": board_id,
                        "contentId": content_id,
                    },
                    "first": PAGE_SIZE,
                }),
            )
            .await?;

        let data: AddItemData = serde_json::from_value(data)?;
        let item = data
            .add_project_v2_item_by_id
            .item
            .ok_or_else(|| Error::Parse(format!("no project item returned for {}", content_id)))?;

        if item.field_values.page_info.has_next_page {
            return Err(Error::TooManyFieldValues {
                item: item.id,
                limit: PAGE_SIZE,
            });
        }

        Ok(BoardItem {
            id: item.id,
            field_values: item
                .field_values
                .into_nodes()
                .into_iter()
                .map(RawFieldValue::normalize)
                .collect(),
        })
    }

    async fn update(
        &self,
        board_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldUpdate,
    ) -> Result<()> {
        self.transport
            .execute(
                UPDATE_FIELD_MUTATION,
                &json!({
                    "input": {
                        "projectId": board_id,
                        "itemId": item_id,
                        "fieldId": field_id,
                        "value": field_value_input(value),
                    }
                }),
            )
            .await?;

        Ok(())
    }
}

/// `ProjectV2FieldValue` input with exactly one member set
fn field_value_input(value: &FieldUpdate) -> Value {
    match value {
        FieldUpdate::Text(text) => json!({ "text": text }),
        FieldUpdate::Date(date) => json!({ "date": date.format("%Y-%m-%d").to_string() }),
        FieldUpdate::Number(number) => json!({ "number": number }),
        FieldUpdate::SingleSelectOption(id) => json!({ "singleSelectOptionId": id }),
    }
}

#[async_trait]
impl BoardGateway for GitHubBoard {
    async fn fetch_board(&self, project: &ProjectRef) -> cardsync_core::Result<Board> {
        Ok(self.board(project).await?)
    }

    async fn list_open_items(
        &self,
        repo: &RepoRef,
        kind: ItemKind,
    ) -> cardsync_core::Result<Vec<TrackedItem>> {
        let items = match kind {
            ItemKind::PullRequest => self.open_pull_requests(repo).await?,
            ItemKind::Issue => self
                .open_items::<RawIssue>(repo, OPEN_ISSUES_QUERY)
                .await?
                .into_iter()
                .map(TrackedItem::from)
                .collect(),
        };

        debug!(repository = %repo, %kind, count = items.len(), "Listed open items");
        Ok(items)
    }

    async fn add_item(&self, board_id: &str, content_id: &str) -> cardsync_core::Result<BoardItem> {
        Ok(self.add(board_id, content_id).await?)
    }

    async fn update_item_field(
        &self,
        board_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldUpdate,
    ) -> cardsync_core::Result<()> {
        Ok(self.update(board_id, item_id, field_id, value).await?)
    }
}
