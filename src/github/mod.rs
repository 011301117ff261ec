// GitHub API module.
// Client, transport, endpoints and paging for the REST API.

pub mod client;
pub mod endpoints;
pub mod pagination;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiCache, CachePayload, GitHubClient, RateLimitHandle};
pub use endpoints::validate_name;
pub use pagination::{RepoPager, chunk_pages};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::*;
