// Repository page streaming.
// Yields an account's repositories one page at a time, from the API or from the cache.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::cache::repos_key;
use crate::error::ApiError;

use super::client::{CachePayload, GitHubClient};
use super::types::{EntityKind, Repository};

enum Source {
    /// Requesting pages from the API, accumulating them for the cache.
    Live {
        next_page: u32,
        collected: Vec<Repository>,
    },
    /// Replaying a cached listing re-chunked into pages.
    Cached { pages: VecDeque<Vec<Repository>> },
    /// Yields one error, then ends.
    Failed(ApiError),
    Finished,
}

/// Lazy, finite sequence of repository pages.
///
/// Ends after an empty page, after the first failure (yielded as the last
/// element), or at the configured page ceiling. A pager is consumed once;
/// calling `GitHubClient::stream_repositories` again starts over from page 1.
pub struct RepoPager<'a> {
    client: &'a GitHubClient,
    name: String,
    kind: EntityKind,
    source: Source,
    pages_yielded: u32,
}

impl<'a> RepoPager<'a> {
    pub(crate) fn live(client: &'a GitHubClient, name: &str, kind: EntityKind) -> Self {
        Self::with_source(
            client,
            name,
            kind,
            Source::Live {
                next_page: 1,
                collected: Vec::new(),
            },
        )
    }

    pub(crate) fn cached(
        client: &'a GitHubClient,
        name: &str,
        kind: EntityKind,
        repos: Vec<Repository>,
    ) -> Self {
        let pages = chunk_pages(repos, client.config().page_size as usize);
        Self::with_source(client, name, kind, Source::Cached { pages })
    }

    pub(crate) fn failed(client: &'a GitHubClient, error: ApiError) -> Self {
        Self::with_source(client, "", EntityKind::User, Source::Failed(error))
    }

    fn with_source(client: &'a GitHubClient, name: &str, kind: EntityKind, source: Source) -> Self {
        Self {
            client,
            name: name.to_string(),
            kind,
            source,
            pages_yielded: 0,
        }
    }

    /// Whether pages are being replayed from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self.source, Source::Cached { .. })
    }

    /// Number of pages yielded so far.
    pub fn pages_yielded(&self) -> u32 {
        self.pages_yielded
    }

    /// Fetch the next page. `None` means the sequence has ended.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Repository>, ApiError>> {
        if let Source::Failed(_) = self.source
            && let Source::Failed(e) = std::mem::replace(&mut self.source, Source::Finished)
        {
            return Some(Err(e));
        }

        let item = match &mut self.source {
            Source::Finished | Source::Failed(_) => return None,
            Source::Cached { pages } => match pages.pop_front() {
                Some(page) => Some(Ok(page)),
                None => {
                    self.source = Source::Finished;
                    None
                }
            },
            Source::Live {
                next_page,
                collected,
            } => {
                let max_pages = self.client.config().max_pages;
                if *next_page > max_pages {
                    warn!(
                        name = %self.name,
                        max_pages,
                        collected = collected.len(),
                        "Page ceiling reached, stopping without caching"
                    );
                    self.source = Source::Finished;
                    return None;
                }

                let page = *next_page;
                match self.client.get_repos_page(&self.name, self.kind, page).await {
                    Err(e) => {
                        debug!(name = %self.name, page, error = %e, "Page request failed");
                        self.source = Source::Finished;
                        Some(Err(e))
                    }
                    Ok(repos) if repos.is_empty() => {
                        let collected = std::mem::take(collected);
                        info!(name = %self.name, total = collected.len(), "Listing complete");
                        self.client
                            .cache()
                            .store(&repos_key(&self.name), CachePayload::Repositories(collected));
                        self.source = Source::Finished;
                        None
                    }
                    Ok(repos) => {
                        debug!(name = %self.name, page, count = repos.len(), "Fetched page");
                        collected.extend(repos.iter().cloned());
                        *next_page += 1;
                        Some(Ok(repos))
                    }
                }
            }
        };

        if matches!(item, Some(Ok(_))) {
            self.pages_yielded += 1;
        }
        item
    }

    /// Drain the remaining pages into one list, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<Repository>, ApiError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await {
            all.extend(page?);
        }
        Ok(all)
    }
}

/// Split a listing into pages of `page_size`, preserving order.
pub fn chunk_pages(repos: Vec<Repository>, page_size: usize) -> VecDeque<Vec<Repository>> {
    let page_size = page_size.max(1);
    let mut pages = VecDeque::with_capacity(repos.len().div_ceil(page_size));
    let mut iter = repos.into_iter().peekable();
    while iter.peek().is_some() {
        pages.push_back(iter.by_ref().take(page_size).collect());
    }
    pages
}
