// GitHub API response types.
// Typed schema for profiles and repositories, decoded once at the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner type discriminator reported by the profile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// Whether a name refers to an individual account or an organization.
/// Selects the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityKind {
    #[default]
    User,
    Organization,
}

impl EntityKind {
    /// Path segment used in REST routes.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Organization => "orgs",
        }
    }
}

impl From<OwnerType> for EntityKind {
    fn from(owner_type: OwnerType) -> Self {
        match owner_type {
            OwnerType::Organization => EntityKind::Organization,
            _ => EntityKind::User,
        }
    }
}

/// GitHub user or organization profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub login: String,
    pub html_url: String,
    pub avatar_url: String,
    #[serde(rename = "type")]
    pub owner_type: OwnerType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_repos: Option<u64>,
}

impl Profile {
    pub fn kind(&self) -> EntityKind {
        self.owner_type.into()
    }
}

/// Repository element as it appears on the wire. Every field except the
/// name is optional so that a sparse element still decodes.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    name: String,
    stargazers_count: Option<u64>,
    forks_count: Option<u64>,
    language: Option<String>,
    description: Option<String>,
    pushed_at: Option<DateTime<Utc>>,
    html_url: Option<String>,
    clone_url: Option<String>,
}

/// A repository belonging to the account being browsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub description: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub clone_url: String,
}

impl From<RepositoryPayload> for Repository {
    fn from(p: RepositoryPayload) -> Self {
        Self {
            name: p.name,
            stars: p.stargazers_count.unwrap_or(0),
            forks: p.forks_count.unwrap_or(0),
            language: p.language,
            description: p.description,
            pushed_at: p.pushed_at,
            html_url: p.html_url.unwrap_or_default(),
            clone_url: p.clone_url.unwrap_or_default(),
        }
    }
}

impl Repository {
    /// Language for display, `-` when unknown.
    pub fn language_display(&self) -> &str {
        self.language.as_deref().unwrap_or("-")
    }

    /// Description flattened to one line, `-` when absent.
    pub fn description_display(&self) -> String {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d.replace('\n', " "),
            _ => "-".to_string(),
        }
    }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Whether the last response reported an exhausted quota.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Reset time as local `HH:MM:SS`, or `unknown`.
    pub fn reset_display(&self) -> String {
        self.reset_at
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Result of the advisory status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub operational: bool,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusPayload {
    pub status: Option<StatusIndicator>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusIndicator {
    pub indicator: Option<String>,
    pub description: Option<String>,
}
