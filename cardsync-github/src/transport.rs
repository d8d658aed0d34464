//! GraphQL transports
//!
//! A transport sends one query or mutation and hands back the `data` object
//! of the response. Any error entry in the response fails the call.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::models::AppId;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{Error, Result};

/// Executes GraphQL documents against the GitHub API
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Run a query or mutation and return its `data` object
    async fn execute(&self, query: &str, variables: &Value) -> Result<Value>;
}

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlResponse {
    fn into_data(self) -> Result<Value> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            return Err(Error::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        match self.data {
            Some(Value::Null) | None => Err(Error::Parse("GraphQL response missing data".to_string())),
            Some(data) => Ok(data),
        }
    }
}

fn request_body(query: &str, variables: &Value) -> Value {
    json!({
        "query": query,
        "variables": variables,
    })
}

/// Token-authenticated transport over plain HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpTransport {
    /// Create a transport for a GraphQL endpoint
    pub fn new(
        token: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("cardsync");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Http(format!("failed to create HTTP client: {}", e)))?;

        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "Created GraphQL HTTP transport");

        Ok(Self {
            client,
            endpoint,
            token: token.into(),
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GraphQlTransport for HttpTransport {
    async fn execute(&self, query: &str, variables: &Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "Sending GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request_body(query, variables))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Status { status, body });
        }

        let response: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse GraphQL response: {}", e)))?;

        response.into_data()
    }
}

/// GitHub App transport scoped to one organization installation
pub struct AppTransport {
    client: Octocrab,
}

impl AppTransport {
    /// Authenticate as the app and switch to its installation on `organization`
    pub async fn for_organization(
        app_id: u64,
        private_key: &str,
        organization: &str,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("invalid GitHub App private key: {}", e)))?;

        let app = Octocrab::builder()
            .app(AppId(app_id), key)
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub App client: {}", e)))?;

        let installation = app
            .apps()
            .get_org_installation(organization)
            .await
            .map_err(|e| {
                Error::Auth(format!(
                    "failed to find installation for organization: {} got: {}",
                    organization, e
                ))
            })?;

        let (client, _token) = app.installation_and_token(installation.id).await?;

        info!(
            app_id,
            organization,
            installation_id = installation.id.0,
            "Authenticated as GitHub App installation"
        );

        Ok(Self { client })
    }
}

impl fmt::Debug for AppTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl GraphQlTransport for AppTransport {
    async fn execute(&self, query: &str, variables: &Value) -> Result<Value> {
        debug!("Sending GraphQL request as app installation");

        let response: GraphQlResponse = self
            .client
            .graphql(&request_body(query, variables))
            .await?;

        response.into_data()
    }
}
