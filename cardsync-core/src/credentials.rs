//! Credential resolution for the GitHub API
//!
//! Either a personal access token or a GitHub App identity is used.
//!
//! Loading priority:
//! 1. GITHUB_TOKEN environment variable
//! 2. Secrets file (~/.config/cardsync/secrets.toml)
//! 3. GITHUB_APP_ID + GITHUB_PRIVATE_KEY environment variables

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Secrets file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub configuration
    pub github: GitHubSecrets,
}

/// GitHub-related secrets
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// GitHub Personal Access Token
    pub token: Option<String>,
}

impl fmt::Debug for GitHubSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSecrets")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = std::fs::metadata(path).map_err(Error::Io)?.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        if let Some(ref mut token) = secrets.github.token {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Returns `~/.config/cardsync/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cardsync").join("secrets.toml"))
    }
}

/// How to authenticate against GitHub
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token or pre-minted installation token
    Token(String),
    /// GitHub App, authenticated per organization installation
    App { app_id: u64, private_key: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credentials::App { app_id, .. } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("private_key", &"<redacted>")
                .finish(),
        }
    }
}

impl Credentials {
    /// Resolve credentials from the process environment and secrets file
    pub fn resolve() -> Result<Self> {
        let secrets = Secrets::load()?;
        Self::resolve_with(|key| std::env::var(key).ok(), &secrets)
    }

    /// Resolve credentials from an explicit variable lookup
    pub fn resolve_with<F>(lookup: F, secrets: &Secrets) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = non_empty(lookup("GITHUB_TOKEN")) {
            debug!("Using GitHub token from GITHUB_TOKEN environment variable");
            return Ok(Credentials::Token(token));
        }

        if let Some(token) = non_empty(secrets.github.token.clone()) {
            debug!("Using GitHub token from secrets file");
            return Ok(Credentials::Token(token));
        }

        match (
            non_empty(lookup("GITHUB_APP_ID")),
            non_empty(lookup("GITHUB_PRIVATE_KEY")),
        ) {
            (Some(app_id), Some(private_key)) => {
                let app_id = app_id.parse::<u64>().map_err(|e| {
                    Error::Auth(format!("failed to parse GITHUB_APP_ID: {}", e))
                })?;
                debug!(app_id, "Using GitHub App credentials");
                Ok(Credentials::App {
                    app_id,
                    private_key: unescape_newlines(&private_key),
                })
            }
            (Some(_), None) => Err(Error::Auth(
                "GITHUB_APP_ID is set but GITHUB_PRIVATE_KEY is missing".to_string(),
            )),
            _ => Err(Error::Auth(
                "GitHub credentials not found. Set GITHUB_TOKEN, add a token to \
                 ~/.config/cardsync/secrets.toml, or set GITHUB_APP_ID and GITHUB_PRIVATE_KEY"
                    .to_string(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Private keys passed through env vars often carry literal `\n` sequences
fn unescape_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}
