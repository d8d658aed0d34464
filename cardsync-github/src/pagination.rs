//! Cursor pagination over GraphQL connections

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::transport::GraphQlTransport;
use crate::{Error, Result};

/// Page size used for every connection
pub const PAGE_SIZE: usize = 100;

/// Relay-style page info
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// One page of a connection; null nodes are dropped
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.nodes.into_iter().flatten().collect()
    }
}

/// Run `query` page by page until the connection reports no further pages
///
/// The cursor is passed as the `$cursor` variable, starting from `start`, and
/// [`PAGE_SIZE`] as `$first`.
/// `extract` pulls the paginated connection out of each page's `data`. The
/// first failing page aborts the whole walk.
pub(crate) async fn paginate<T, E>(
    transport: &dyn GraphQlTransport,
    query: &str,
    variables: Value,
    start: Option<String>,
    mut extract: E,
) -> Result<Vec<T>>
where
    T: Send,
    E: FnMut(Value) -> Result<Connection<T>> + Send,
{
    let mut nodes = Vec::new();
    let mut cursor = start;
    let mut pages = 0usize;

    loop {
        let mut page_variables = variables.clone();
        page_variables["first"] = Value::from(PAGE_SIZE);
        page_variables["cursor"] = cursor.take().map_or(Value::Null, Value::String);

        let data = transport.execute(query, &page_variables).await?;
        let page = extract(data)?;
        pages += 1;

        let has_next_page = page.page_info.has_next_page;
        let end_cursor = page.page_info.end_cursor.clone();
        nodes.extend(page.into_nodes());

        if !has_next_page {
            break;
        }

        cursor = Some(end_cursor.ok_or_else(|| {
            Error::Parse("connection reports another page but no end cursor".to_string())
        })?);
    }

    debug!(pages, nodes = nodes.len(), "Collected paginated connection");

    Ok(nodes)
}
