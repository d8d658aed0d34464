//! CLI command implementations

pub mod fields;
pub mod sync;

use anyhow::Context;
use cardsync_core::config::DEFAULT_ENDPOINT;
use cardsync_core::{Config, Credentials};
use cardsync_github::{AppTransport, GitHubBoard, GraphQlTransport, HttpTransport};

/// Build an authenticated board gateway from the environment
pub async fn connect(config: &Config) -> anyhow::Result<GitHubBoard> {
    let credentials = Credentials::resolve().context("failed to resolve GitHub credentials")?;

    let transport: Box<dyn GraphQlTransport> = match credentials {
        Credentials::Token(token) => Box::new(
            HttpTransport::new(token, config.api.endpoint.clone(), config.api.timeout)
                .context("failed to set up GitHub client")?,
        ),
        Credentials::App {
            app_id,
            private_key,
        } => {
            if config.api.endpoint != DEFAULT_ENDPOINT {
                tracing::warn!(
                    endpoint = %config.api.endpoint,
                    "GitHub App authentication always talks to api.github.com; endpoint is ignored"
                );
            }
            Box::new(
                AppTransport::for_organization(app_id, &private_key, &config.project.organization)
                    .await
                    .context("failed to setup app auth")?,
            )
        }
    };

    Ok(GitHubBoard::new(transport))
}
