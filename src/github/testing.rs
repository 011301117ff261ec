// Scripted transport for tests.
// Serves canned responses by URL and records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::Config;
use crate::error::ApiError;

use super::client::GitHubClient;
use super::transport::{HttpRequest, HttpResponse, Transport};

type Scripted = Result<HttpResponse, ApiError>;

/// Fake transport keyed by `HttpRequest::display_url`.
///
/// Each URL holds a queue of responses; the last one repeats. Unknown URLs
/// answer 404.
#[derive(Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_with_headers(url, status, body, &[]);
    }

    pub fn respond_with_headers(
        &self,
        url: &str,
        status: u16,
        body: &str,
        headers: &[(&str, &str)],
    ) {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.insert(
                HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        self.push(
            url,
            Ok(HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: map,
                body: body.as_bytes().to_vec(),
            }),
        );
    }

    pub fn fail(&self, url: &str, error: ApiError) {
        self.push(url, Err(error));
    }

    fn push(&self, url: &str, response: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL contains `needle`.
    pub fn request_count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.display_url().contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.display_url();
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: br#"{"message": "Not Found"}"#.to_vec(),
            }),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        api_base: "https://api.test".to_string(),
        status_url: "https://status.test/api/v2/status.json".to_string(),
        ..Config::default()
    }
}

pub fn client_with(fake: &FakeTransport) -> GitHubClient {
    client_with_config(fake, test_config())
}

pub fn client_with_config(fake: &FakeTransport, config: Config) -> GitHubClient {
    GitHubClient::with_transport(config, Arc::new(fake.clone()))
}

pub fn profile_json(login: &str, owner_type: &str) -> String {
    format!(
        r#"{{"login": "{login}", "html_url": "https://github.com/{login}",
            "avatar_url": "https://avatars.test/{login}", "type": "{owner_type}"}}"#
    )
}

/// JSON array of `count` repositories named `repo-<start>`, `repo-<start+1>`, ...
pub fn repos_json(start: usize, count: usize) -> String {
    let items: Vec<String> = (start..start + count)
        .map(|i| {
            format!(
                r#"{{"name": "repo-{i}", "stargazers_count": {i}, "forks_count": 1,
                    "language": "Rust", "pushed_at": "2024-01-{day:02}T00:00:00Z",
                    "html_url": "https://github.com/o/repo-{i}",
                    "clone_url": "https://github.com/o/repo-{i}.git"}}"#,
                day = i % 28 + 1
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

/// URL of one repository page for `name` under `segment` (`users` or `orgs`).
pub fn page_url(segment: &str, name: &str, page: u32) -> String {
    format!("https://api.test/{segment}/{name}/repos?per_page=100&page={page}&sort=updated")
}

/// Script a listing of `total` repositories in pages of 100, followed by
/// the terminating empty page.
pub fn script_listing(fake: &FakeTransport, segment: &str, name: &str, total: usize) {
    let mut page = 1u32;
    let mut start = 0usize;
    while start < total {
        let count = (total - start).min(100);
        fake.respond(&page_url(segment, name, page), 200, &repos_json(start, count));
        start += count;
        page += 1;
    }
    fake.respond(&page_url(segment, name, page), 200, "[]");
}
