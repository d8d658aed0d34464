//! Sync configuration
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (CARDSYNC_*)
//! 3. Config file (config.yml by default)
//! 4. Default values
//!
//! Field rules are kept as written. Rule types and field names are only
//! checked when the engine reaches them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// GitHub's public GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Board to sync into
    pub project: ProjectRef,

    /// API transport settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Repositories in processing order
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
}

/// Organization project reference
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectRef {
    /// Organization login
    pub organization: String,
    /// Project number within the organization
    pub number: u32,
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.organization, self.number)
    }
}

/// API transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint
    pub endpoint: String,

    /// Per-request timeout, e.g. "30s"
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

/// One repository and the fields to populate for its items
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Repository as `owner/name` or a GitHub URL
    pub name: String,

    /// Field rules applied to every open item, in order
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl RepositoryConfig {
    /// Parse the configured name into owner and repository
    pub fn repo_ref(&self) -> Result<RepoRef> {
        self.name.parse()
    }
}

/// A declarative rule for one board field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldRule {
    /// Board field name
    pub name: String,

    /// Rule type as written, see [`RuleType`]
    #[serde(rename = "type")]
    pub rule_type: String,

    /// Literal value for the single-select rules
    #[serde(default)]
    pub value: String,
}

impl FieldRule {
    pub fn new(
        name: impl Into<String>,
        rule_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            rule_type: rule_type.into(),
            value: value.into(),
        }
    }

    /// Interpret the rule type
    pub fn kind(&self) -> Result<RuleType> {
        self.rule_type.parse()
    }
}

/// Recognized field rule types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    /// Pull request draft flag as option "true"/"false"
    Draft,
    /// Non-vendored changed lines of a pull request
    Changes,
    /// Author login as text
    Author,
    /// Last timeline activity as date
    LastActivity,
    /// Configured option, only when the field is still empty
    DefaultSingleSelect,
    /// Configured option, always
    SingleSelect,
    /// "Pull Request" or "Issue" option
    Type,
}

impl FromStr for RuleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(RuleType::Draft),
            "changes" => Ok(RuleType::Changes),
            "author" => Ok(RuleType::Author),
            "last_activity" => Ok(RuleType::LastActivity),
            "default_single_select" => Ok(RuleType::DefaultSingleSelect),
            "single_select" => Ok(RuleType::SingleSelect),
            "type" => Ok(RuleType::Type),
            other => Err(Error::UnsupportedRule {
                rule: other.to_string(),
            }),
        }
    }
}

/// Repository owner and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    fn from_str(s: &str) -> Result<Self> {
        let (owner, name) = parse_repository(s)?;
        Ok(Self { owner, name })
    }
}

fn parse_repository(repo: &str) -> Result<(String, String)> {
    let invalid = || {
        Error::Config(format!(
            "Invalid repository format: {}. Expected owner/repo",
            repo
        ))
    };

    let path = if repo.starts_with("https://") || repo.starts_with("http://") {
        let url = url::Url::parse(repo)
            .map_err(|e| Error::Config(format!("Invalid repository URL: {}: {}", repo, e)))?;
        url.path().to_string()
    } else if let Some(rest) = repo.strip_prefix("git@") {
        rest.split_once(':').ok_or_else(invalid)?.1.to_string()
    } else {
        repo.to_string()
    };

    let path = path.trim_matches('/').trim_end_matches(".git");
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(invalid()),
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - CARDSYNC_API_ENDPOINT: GraphQL endpoint (GitHub Enterprise)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("CARDSYNC_API_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.api.endpoint = endpoint.trim().to_string();
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.api.endpoint = endpoint;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(path: impl AsRef<Path>, endpoint: Option<String>) -> Result<Self> {
        Ok(Self::load_from_file(path)?
            .with_env_overrides()
            .with_cli_overrides(endpoint))
    }
}
