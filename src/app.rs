// Application composition root.
// Owns the client and dispatcher, starts sessions and drives the poll loop.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::session::{AvatarFetcher, Dispatcher, SessionId, spawn_session};
use crate::state::{FetchState, SortColumn};

/// A downloaded avatar image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Most recently downloaded avatar, shared with the fetch tasks.
#[derive(Debug, Clone, Default)]
pub struct AvatarSlot(Arc<RwLock<Option<Avatar>>>);

impl AvatarSlot {
    pub fn get(&self) -> Option<Avatar> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, avatar: Option<Avatar>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = avatar;
    }
}

/// Downloads avatars on the current runtime. Failures are logged only.
struct SpawningAvatarFetcher {
    client: Arc<GitHubClient>,
    slot: AvatarSlot,
}

impl AvatarFetcher for SpawningAvatarFetcher {
    fn fetch(&self, url: &str) {
        self.slot.set(None);
        if url.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(url, "No runtime available for avatar download");
            return;
        };

        let client = Arc::clone(&self.client);
        let slot = self.slot.clone();
        let url = url.to_string();
        handle.spawn(async move {
            match client.fetch_avatar(&url).await {
                Ok(bytes) => {
                    debug!(url = %url, size = bytes.len(), "Avatar downloaded");
                    slot.set(Some(Avatar { url, bytes }));
                }
                Err(e) => warn!(url = %url, error = %e, "Avatar download failed"),
            }
        });
    }
}

/// Main application state.
pub struct App {
    client: Arc<GitHubClient>,
    dispatcher: Dispatcher,
    avatar: AvatarSlot,
    worker: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = GitHubClient::new(config)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    pub fn with_client(client: Arc<GitHubClient>) -> Self {
        let avatar = AvatarSlot::default();
        let dispatcher = Dispatcher::new(client.rate_limit_handle(), client.config().drain_limit)
            .with_avatar_fetcher(SpawningAvatarFetcher {
                client: Arc::clone(&client),
                slot: avatar.clone(),
            });

        Self {
            client,
            dispatcher,
            avatar,
            worker: None,
        }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn state(&self) -> &FetchState {
        self.dispatcher.state()
    }

    pub fn avatar(&self) -> Option<Avatar> {
        self.avatar.get()
    }

    /// Start fetching `name` in the background, superseding any running session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_fetch(&mut self, name: &str) -> SessionId {
        let tx = self.dispatcher.begin_session(name);
        let session = tx.session();
        // The previous worker sees its cancel flag and stops on its own.
        self.worker = Some(spawn_session(
            Arc::clone(&self.client),
            name.to_string(),
            tx,
        ));
        session
    }

    /// Handle one batch of queued session messages.
    pub fn tick(&mut self) -> usize {
        self.dispatcher.tick()
    }

    /// Drive the dispatcher at the configured poll interval until the
    /// current session completes or fails.
    pub async fn run_until_finished(&mut self) {
        let interval = self.client.config().poll_interval;
        self.dispatcher.run_until_finished(interval).await;
    }

    pub fn set_filter(&mut self, filter: &str) {
        let state = self.dispatcher.state_mut();
        state.view.set_filter(&state.records, filter);
    }

    pub fn sort_by(&mut self, column: SortColumn) {
        let state = self.dispatcher.state_mut();
        state.view.sort_by(&state.records, column);
    }

    pub fn next_page(&mut self) -> bool {
        self.dispatcher.state_mut().view.next_page()
    }

    pub fn prev_page(&mut self) -> bool {
        self.dispatcher.state_mut().view.prev_page()
    }
}
