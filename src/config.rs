// Runtime configuration.
// Built once at startup and passed explicitly into the client and dispatcher.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache;
use crate::error::{Error, Result};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_STATUS_URL: &str = "https://www.githubstatus.com/api/v2/status.json";

/// Configuration for the fetch pipeline.
#[derive(Clone)]
pub struct Config {
    /// Personal access token. Absent means anonymous, lower rate limit.
    pub token: Option<String>,
    /// Base URL of the REST API.
    pub api_base: String,
    /// Status page endpoint.
    pub status_url: String,
    /// How long cached profiles and repository lists stay valid.
    pub cache_ttl: Duration,
    /// Directory for the on-disk cache. `None` keeps the cache in memory only.
    pub cache_dir: Option<PathBuf>,
    /// Repositories per page request.
    pub page_size: u32,
    /// Safety ceiling on the number of pages streamed for one account.
    pub max_pages: u32,
    pub status_timeout: Duration,
    pub profile_timeout: Duration,
    pub page_timeout: Duration,
    pub avatar_timeout: Duration,
    /// Dispatcher tick interval.
    pub poll_interval: Duration,
    /// Maximum messages handled per dispatcher tick.
    pub drain_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_base: GITHUB_API_BASE.to_string(),
            status_url: GITHUB_STATUS_URL.to_string(),
            cache_ttl: cache::DEFAULT_TTL,
            cache_dir: None,
            page_size: 100,
            max_pages: 1000,
            status_timeout: Duration::from_secs(5),
            profile_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(15),
            avatar_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            drain_limit: 10,
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("status_url", &self.status_url)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_dir", &self.cache_dir)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("poll_interval", &self.poll_interval)
            .field("drain_limit", &self.drain_limit)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build configuration from the environment, loading `.env` first if present.
    ///
    /// Reads `GITHUB_PAT` (falling back to `GITHUB_TOKEN`),
    /// `REPOFETCH_API_BASE` and `REPOFETCH_CACHE_TTL_SECS`.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the common case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.token = lookup("GITHUB_PAT")
            .or_else(|| lookup("GITHUB_TOKEN"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(base) = lookup("REPOFETCH_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        if let Some(ttl) = lookup("REPOFETCH_CACHE_TTL_SECS") {
            let secs: u64 = ttl.trim().parse().map_err(|_| {
                Error::Config(format!("REPOFETCH_CACHE_TTL_SECS is not a number: {ttl}"))
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Enable on-disk caching in the platform cache directory.
    pub fn with_default_cache_dir(mut self) -> Self {
        self.cache_dir = cache::cache_dir();
        self
    }

    /// Whether requests will carry a credential.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
