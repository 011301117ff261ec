// GitHub API HTTP client.
// Handles credentials, rate limit tracking, caching and response classification.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, header::HeaderMap};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::ApiError;

use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use super::types::{Profile, RateLimitState, Repository};

/// Payloads kept in the API cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CachePayload {
    Profile(Profile),
    Repositories(Vec<Repository>),
}

pub type ApiCache = TtlCache<CachePayload>;

/// Shared, last-writer-wins rate limit record.
///
/// Advisory only: whichever response was processed most recently wins.
#[derive(Debug, Clone, Default)]
pub struct RateLimitHandle {
    inner: Arc<RwLock<RateLimitState>>,
}

impl RateLimitHandle {
    pub fn snapshot(&self) -> RateLimitState {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply rate limit headers. Each header is applied independently;
    /// absent or malformed headers leave the previous value in place.
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = header_u64(headers, "x-ratelimit-remaining");
        let reset_at = header_u64(headers, "x-ratelimit-reset")
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        if remaining.is_none() && reset_at.is_none() {
            return;
        }

        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(remaining) = remaining {
            state.remaining = Some(remaining);
        }
        if let Some(reset_at) = reset_at {
            state.reset_at = Some(reset_at);
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// GitHub API client with authentication, rate limit tracking and caching.
///
/// All methods take `&self`; the client is meant to be shared behind an `Arc`
/// between the session worker and the avatar loader.
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    config: Config,
    rate_limit: RateLimitHandle,
    cache: ApiCache,
}

impl GitHubClient {
    /// Create a client talking to the real API.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let cache = TtlCache::new(config.cache_ttl).with_dir(config.cache_dir.clone());
        Self {
            transport,
            config,
            rate_limit: RateLimitHandle::default(),
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current rate limit information.
    pub fn rate_limit(&self) -> RateLimitState {
        self.rate_limit.snapshot()
    }

    /// Shared handle to the rate limit record.
    pub fn rate_limit_handle(&self) -> RateLimitHandle {
        self.rate_limit.clone()
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    /// Build an authenticated API request for `endpoint`.
    pub(crate) fn api_request(
        &self,
        endpoint: &str,
        timeout: std::time::Duration,
    ) -> HttpRequest {
        let url = format!("{}{}", self.config.api_base, endpoint);
        HttpRequest::get(url, timeout).token(self.config.token.as_deref())
    }

    /// Send a request, record rate limit headers and check the status.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.display_url();
        debug!(url = %url, "GET");

        let response = self.transport.get(request).await?;
        self.rate_limit.update_from_headers(&response.headers);
        debug!(url = %url, status = response.status.as_u16(), "Response");

        check_response(response)
    }

    /// Send a request and decode its JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Check response status and convert errors.
fn check_response(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let message = match status {
        StatusCode::UNAUTHORIZED => "Bad credentials".to_string(),
        StatusCode::NOT_FOUND => "Not Found".to_string(),
        _ => error_message(&response),
    };

    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Prefer the `message` field GitHub puts in error bodies.
fn error_message(response: &HttpResponse) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_slice::<ErrorBody>(&response.body)
        .map(|body| body.message)
        .unwrap_or_else(|_| {
            response
                .status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}
