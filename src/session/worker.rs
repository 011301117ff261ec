// Fetch session worker.
// Runs status probe, profile lookup and repository streaming in a background task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::github::{GitHubClient, validate_name};

use super::message::{Message, Progress, SessionSender};

/// Spawn a session worker.
///
/// A panic inside the worker is caught at this boundary and reported to the
/// dispatcher as a generic error.
pub fn spawn_session(
    client: Arc<GitHubClient>,
    name: String,
    tx: SessionSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let session = tx.session();
        let inner = tokio::spawn(run_session(client, name, tx.clone()));
        if let Err(e) = inner.await {
            warn!(session, error = %e, "Fetch worker failed");
            tx.send(Message::Progress(Progress::Stop));
            tx.send(Message::Error(ApiError::Internal(format!(
                "Unexpected failure while fetching repositories: {}",
                e
            ))));
        }
    })
}

/// Run one fetch session to completion, reporting through `tx`.
///
/// Sends at most one `Error`; after an error, or a `Done`, nothing else is sent.
pub async fn run_session(client: Arc<GitHubClient>, name: String, tx: SessionSender) {
    let session = tx.session();

    let name = match validate_name(&name) {
        Ok(name) => name.to_string(),
        Err(e) => {
            tx.send(Message::Error(e));
            return;
        }
    };

    info!(session, name = %name, "Starting fetch");
    tx.send(Message::Status("Checking GitHub status...".to_string()));
    tx.send(Message::Progress(Progress::Start));

    let status = client.check_status().await;
    if !status.operational {
        warn!(session, description = %status.description, "GitHub status degraded");
        tx.send(Message::Status(format!(
            "GitHub may be experiencing issues: {}",
            status.description
        )));
    }

    if tx.is_cancelled() {
        debug!(session, "Cancelled before profile lookup");
        return;
    }

    tx.send(Message::Status(format!("Fetching profile for '{}'...", name)));
    let profile = match client.get_profile(&name).await {
        Ok(profile) => profile,
        Err(e) => {
            tx.send(Message::Error(e));
            return;
        }
    };
    let kind = profile.kind();
    tx.send(Message::Profile(profile));
    tx.send(Message::RateLimit);

    tx.send(Message::Status(format!(
        "Streaming repositories for '{}'...",
        name
    )));

    let mut pager = client.stream_repositories(&name, kind);
    loop {
        if tx.is_cancelled() {
            debug!(session, pages = pager.pages_yielded(), "Cancelled between pages");
            return;
        }

        match pager.next_page().await {
            Some(Ok(page)) => {
                tx.send(Message::Page(page));
                tx.send(Message::RateLimit);
            }
            Some(Err(e)) => {
                tx.send(Message::Error(e));
                return;
            }
            None => break,
        }
    }

    info!(session, name = %name, pages = pager.pages_yielded(), "Fetch complete");
    tx.send(Message::Done);
}
