// GitHub API endpoint functions.
// Typed methods for the status probe, profile lookup, repository pages and avatars.

use tracing::{debug, info};

use crate::cache::{profile_key, repos_key};
use crate::error::ApiError;

use super::client::{CachePayload, GitHubClient};
use super::pagination::RepoPager;
use super::transport::HttpRequest;
use super::types::{
    EntityKind, Profile, Repository, RepositoryPayload, StatusPayload, StatusReport,
};

/// Validate and trim an account name before it reaches the network.
pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Please enter a GitHub username or organization.".to_string(),
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ApiError::Validation(format!(
            "'{}' is not a valid account name (unexpected {:?})",
            name, c
        )));
    }
    Ok(name)
}

impl GitHubClient {
    /// Probe the public status page. Never cached, never fails: any problem
    /// is reported as not operational with a diagnostic description.
    pub async fn check_status(&self) -> StatusReport {
        let request = HttpRequest::get(&self.config().status_url, self.config().status_timeout);

        let payload: StatusPayload = match self.get_json(request).await {
            Ok(payload) => payload,
            Err(e) => {
                return StatusReport {
                    operational: false,
                    description: format!("Could not verify GitHub status: {}", e),
                };
            }
        };

        match payload.status {
            Some(status) => match status.indicator {
                Some(indicator) => StatusReport {
                    operational: indicator == "none",
                    description: status.description.unwrap_or_else(|| "Unknown".to_string()),
                },
                None => StatusReport {
                    operational: false,
                    description: "Status response is missing status.indicator".to_string(),
                },
            },
            None => StatusReport {
                operational: false,
                description: "Status response is missing status.indicator".to_string(),
            },
        }
    }

    /// Look up a profile through the users endpoint, which resolves
    /// organizations as well.
    pub async fn get_profile(&self, name: &str) -> Result<Profile, ApiError> {
        self.get_profile_as(name, EntityKind::User).await
    }

    /// Look up a profile through the endpoint for `kind`.
    ///
    /// Served from the cache while a previous successful lookup is valid.
    /// Failures are never cached.
    pub async fn get_profile_as(&self, name: &str, kind: EntityKind) -> Result<Profile, ApiError> {
        let name = validate_name(name)?;
        let key = profile_key(name);

        if let Some(CachePayload::Profile(profile)) = self.cache().lookup(&key) {
            debug!(key = %key, "Profile cache hit");
            return Ok(profile);
        }

        let request = self.api_request(
            &format!("/{}/{}", kind.path_segment(), name),
            self.config().profile_timeout,
        );
        let profile: Profile = self.get_json(request).await?;

        info!(login = %profile.login, kind = ?profile.kind(), "Resolved profile");
        self.cache().store(&key, CachePayload::Profile(profile.clone()));
        Ok(profile)
    }

    /// Fetch one page of an account's repositories, most recently updated first.
    pub async fn get_repos_page(
        &self,
        name: &str,
        kind: EntityKind,
        page: u32,
    ) -> Result<Vec<Repository>, ApiError> {
        let name = validate_name(name)?;
        let request = self
            .api_request(
                &format!("/{}/{}/repos", kind.path_segment(), name),
                self.config().page_timeout,
            )
            .query("per_page", self.config().page_size)
            .query("page", page)
            .query("sort", "updated");

        let payload: Vec<RepositoryPayload> = self.get_json(request).await?;
        Ok(payload.into_iter().map(Repository::from).collect())
    }

    /// Stream an account's repositories one page at a time.
    ///
    /// Each call starts from page 1, or from the cached listing if one is valid.
    pub fn stream_repositories(&self, name: &str, kind: EntityKind) -> RepoPager<'_> {
        let name = name.trim();
        match validate_name(name) {
            Err(e) => RepoPager::failed(self, e),
            Ok(name) => match self.cache().lookup(&repos_key(name)) {
                Some(CachePayload::Repositories(repos)) => {
                    debug!(name, count = repos.len(), "Repository list cache hit");
                    RepoPager::cached(self, name, kind, repos)
                }
                _ => RepoPager::live(self, name, kind),
            },
        }
    }

    /// Download an avatar image. Unauthenticated; the URL is absolute.
    pub async fn fetch_avatar(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let request = HttpRequest::get(url, self.config().avatar_timeout);
        let response = self.send(request).await?;
        Ok(response.body)
    }
}
