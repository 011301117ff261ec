// Session message dispatcher.
// Drains the worker queue on a fixed tick and applies messages to observable state.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::github::{RateLimitHandle, RateLimitState};
use crate::state::{ErrorNotice, FetchState, Insights, SessionPhase, last_activity};

use super::message::{CancelToken, Envelope, Message, Progress, SessionId, SessionSender};

/// Starts a best-effort avatar download for a profile.
///
/// Implementations must not block: the dispatcher calls this from its tick.
pub trait AvatarFetcher: Send {
    fn fetch(&self, url: &str);
}

/// Avatar fetcher that does nothing.
#[derive(Debug, Default)]
pub struct NoAvatar;

impl AvatarFetcher for NoAvatar {
    fn fetch(&self, _url: &str) {}
}

/// Consumer side of the session queue.
///
/// Owns the observable `FetchState`. Never performs network I/O; the only
/// input it reads besides the queue is the shared rate limit record.
pub struct Dispatcher {
    tx: UnboundedSender<Envelope>,
    rx: UnboundedReceiver<Envelope>,
    state: FetchState,
    session: SessionId,
    cancel: CancelToken,
    rate_limit: RateLimitHandle,
    avatars: Box<dyn AvatarFetcher>,
    drain_limit: usize,
}

impl Dispatcher {
    pub fn new(rate_limit: RateLimitHandle, drain_limit: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            state: FetchState::default(),
            session: 0,
            cancel: CancelToken::new(),
            rate_limit,
            avatars: Box::new(NoAvatar),
            drain_limit: drain_limit.max(1),
        }
    }

    pub fn with_avatar_fetcher(mut self, fetcher: impl AvatarFetcher + 'static) -> Self {
        self.avatars = Box::new(fetcher);
        self
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Mutable access for view operations (filter, sort, paging).
    pub fn state_mut(&mut self) -> &mut FetchState {
        &mut self.state
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Start a new session for `name` and return its producer handle.
    ///
    /// Cancels the previous session's worker, discards everything already
    /// queued and resets state to idle with an empty buffer.
    pub fn begin_session(&mut self, name: &str) -> SessionSender {
        self.cancel.cancel();

        let mut discarded = 0usize;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }

        self.session += 1;
        self.cancel = CancelToken::new();
        self.state.reset(name.trim());
        self.state.phase = SessionPhase::Running;

        debug!(session = self.session, discarded, "Session started");
        SessionSender::new(self.session, self.tx.clone(), self.cancel.clone())
    }

    /// Handle up to `drain_limit` queued messages. Returns how many were taken
    /// off the queue, including stale ones from superseded sessions.
    pub fn tick(&mut self) -> usize {
        let mut taken = 0;
        while taken < self.drain_limit {
            let Ok(envelope) = self.rx.try_recv() else {
                break;
            };
            taken += 1;

            if envelope.session != self.session {
                debug!(
                    stale = envelope.session,
                    current = self.session,
                    kind = envelope.message.kind(),
                    "Dropping message from superseded session"
                );
                continue;
            }
            self.handle(envelope.message);
        }
        taken
    }

    /// Tick on a fixed interval until the current session ends.
    pub async fn run_until_finished(&mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while !self.state.phase.is_terminal() {
            ticker.tick().await;
            self.tick();
        }
    }

    fn handle(&mut self, message: Message) {
        if self.state.phase.is_terminal() {
            debug!(kind = message.kind(), "Ignoring message after session ended");
            return;
        }

        match message {
            Message::Status(text) => self.state.status = text,
            Message::Progress(Progress::Start) => self.state.busy = true,
            Message::Progress(Progress::Stop) => self.state.busy = false,
            Message::RateLimit => self.state.rate_limit = self.rate_limit.snapshot(),
            Message::Profile(profile) => {
                self.avatars.fetch(&profile.avatar_url);
                self.state.profile = Some(profile);
            }
            Message::Page(records) => {
                self.state.pages += 1;
                self.state.records.extend(records);
                let state = &mut self.state;
                state.view.refilter(&state.records, false);
                state.status = state.view.summary(state.records.len());
            }
            Message::Error(error) => {
                let notice = classify(&error, &self.state.name, &self.rate_limit.snapshot());
                warn!(name = %self.state.name, error = %error, title = %notice.title, "Fetch failed");
                self.state.busy = false;
                self.state.phase = SessionPhase::Failed;
                self.state.status = format!("Error: {}", error);
                self.state.rate_limit = self.rate_limit.snapshot();
                self.state.last_error = Some(notice);
            }
            Message::Done => {
                let state = &mut self.state;
                state.busy = false;
                state.phase = SessionPhase::Done;
                state.last_activity = last_activity(&state.records);
                state.insights = Some(Insights::compute(&state.records, Utc::now()));
                state.status = format!("Finished. Loaded {} repositories.", state.records.len());
                info!(name = %state.name, total = state.records.len(), pages = state.pages, "Session finished");
            }
        }
    }
}

/// Turn a classified API error into what the user sees.
pub fn classify(error: &ApiError, name: &str, rate_limit: &RateLimitState) -> ErrorNotice {
    let (title, message, retryable) = match error {
        ApiError::Validation(message) => ("Input Required", message.clone(), false),
        ApiError::Http { status: 404, .. } => (
            "Not Found",
            format!("GitHub user/org '{}' not found.", name),
            false,
        ),
        ApiError::Http { status: 403, .. } if rate_limit.is_exhausted() => (
            "Rate Limit",
            format!(
                "GitHub API rate limit reached. Your limit will reset at {}. \
                 Check your token or wait for the limit to reset.",
                rate_limit.reset_display()
            ),
            true,
        ),
        ApiError::Http {
            status: 403,
            message,
        } => (
            "Access Denied",
            format!("GitHub denied access: {}", message),
            false,
        ),
        ApiError::Http { status: 401, .. } => (
            "Unauthorized",
            "Invalid or missing GitHub Personal Access Token.".to_string(),
            false,
        ),
        ApiError::Http { .. } => (
            "API Error",
            format!("An error occurred: {}", error),
            error.is_transient(),
        ),
        ApiError::Timeout(_) | ApiError::Connection(_) => (
            "Network Error",
            format!("Could not reach GitHub: {}", error),
            true,
        ),
        ApiError::Protocol(_) => (
            "Unexpected Response",
            format!("GitHub returned data that could not be read: {}", error),
            true,
        ),
        ApiError::Internal(_) => ("Error", error.to_string(), true),
    };

    ErrorNotice {
        title: title.to_string(),
        message,
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Repository;
    use std::sync::{Arc, Mutex};

    fn repos(start: usize, count: usize) -> Vec<Repository> {
        (start..start + count)
            .map(|i| Repository {
                name: format!("repo-{}", i),
                stars: i as u64,
                forks: 0,
                language: None,
                description: None,
                pushed_at: None,
                html_url: String::new(),
                clone_url: String::new(),
            })
            .collect()
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(RateLimitHandle::default(), 10)
    }

    #[derive(Clone, Default)]
    struct RecordingAvatars(Arc<Mutex<Vec<String>>>);

    impl AvatarFetcher for RecordingAvatars {
        fn fetch(&self, url: &str) {
            self.0.lock().unwrap().push(url.to_string());
        }
    }

    #[test]
    fn test_tick_drains_at_most_limit() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("octocat");
        for i in 0..25 {
            tx.send(Message::Page(repos(i * 2, 2)));
        }

        assert_eq!(dispatcher.tick(), 10);
        assert_eq!(dispatcher.state().pages, 10);
        assert_eq!(dispatcher.tick(), 10);

        let names: Vec<String> = dispatcher
            .state()
            .records
            .iter()
            .map(|r| r.name.clone())
            .collect();
        let expected: Vec<String> = repos(0, 40).into_iter().map(|r| r.name).collect();
        assert_eq!(names, expected);

        assert_eq!(dispatcher.tick(), 5);
        assert_eq!(dispatcher.tick(), 0);
        assert_eq!(dispatcher.state().records.len(), 50);
    }

    #[test]
    fn test_done_computes_summary() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("octocat");
        tx.send(Message::Progress(Progress::Start));
        tx.send(Message::Page(repos(0, 3)));
        dispatcher.tick();
        assert!(dispatcher.state().busy);

        tx.send(Message::Done);
        dispatcher.tick();
        let state = dispatcher.state();
        assert!(!state.busy);
        assert_eq!(state.phase, SessionPhase::Done);
        assert_eq!(state.status, "Finished. Loaded 3 repositories.");
        assert_eq!(state.insights.as_ref().unwrap().total_stars, 3);
    }

    #[test]
    fn test_profile_triggers_avatar_fetch() {
        let avatars = RecordingAvatars::default();
        let mut dispatcher = dispatcher().with_avatar_fetcher(avatars.clone());
        let tx = dispatcher.begin_session("octocat");
        let profile: crate::github::Profile = serde_json::from_str(
            r#"{"login": "octocat", "html_url": "https://github.com/octocat",
                "avatar_url": "https://avatars.test/octocat", "type": "User"}"#,
        )
        .unwrap();
        tx.send(Message::Profile(profile));
        dispatcher.tick();

        assert_eq!(
            dispatcher.state().profile.as_ref().unwrap().login,
            "octocat"
        );
        assert_eq!(
            *avatars.0.lock().unwrap(),
            vec!["https://avatars.test/octocat".to_string()]
        );
    }

    #[test]
    fn test_error_stops_progress_and_is_surfaced_once() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("ghost");
        tx.send(Message::Progress(Progress::Start));
        tx.send(Message::Error(ApiError::Http {
            status: 404,
            message: "Not Found".to_string(),
        }));
        tx.send(Message::Error(ApiError::Timeout("late".to_string())));
        dispatcher.tick();

        let state = dispatcher.state();
        assert!(!state.busy);
        assert_eq!(state.phase, SessionPhase::Failed);
        let notice = state.last_error.as_ref().unwrap();
        assert_eq!(notice.title, "Not Found");
        assert_eq!(notice.message, "GitHub user/org 'ghost' not found.");
    }

    #[test]
    fn test_new_session_discards_queued_messages() {
        let mut dispatcher = dispatcher();
        let old = dispatcher.begin_session("first");
        old.send(Message::Page(repos(0, 5)));
        old.send(Message::Done);

        let new = dispatcher.begin_session("second");
        assert!(old.is_cancelled());
        assert!(!new.is_cancelled());
        assert_eq!(dispatcher.state().name, "second");
        assert_eq!(dispatcher.state().phase, SessionPhase::Running);

        // A worker from the first session that is still running.
        old.send(Message::Page(repos(100, 5)));
        new.send(Message::Page(repos(0, 2)));
        assert_eq!(dispatcher.tick(), 2);
        assert_eq!(dispatcher.state().records.len(), 2);
        assert_eq!(dispatcher.state().phase, SessionPhase::Running);
    }

    #[test]
    fn test_new_session_resets_after_failure() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("ghost");
        tx.send(Message::Error(ApiError::Connection("down".to_string())));
        dispatcher.tick();
        assert!(dispatcher.state().last_error.is_some());

        dispatcher.begin_session("octocat");
        let state = dispatcher.state();
        assert!(state.last_error.is_none());
        assert!(state.records.is_empty());
        assert_eq!(state.phase, SessionPhase::Running);
    }

    #[test]
    fn test_page_keeps_view_position() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("octocat");
        tx.send(Message::Page(repos(0, 100)));
        dispatcher.tick();
        dispatcher.state_mut().view.next_page();

        tx.send(Message::Page(repos(100, 100)));
        dispatcher.tick();
        let state = dispatcher.state();
        assert_eq!(state.view.current_page(), 1);
        assert_eq!(
            state.status,
            "Page 2/8 | Displaying 200 of 200 loaded repos."
        );
    }

    #[test]
    fn test_rate_limit_message_reads_shared_state() {
        let handle = RateLimitHandle::default();
        let mut dispatcher = Dispatcher::new(handle.clone(), 10);
        let tx = dispatcher.begin_session("octocat");

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "41".parse().unwrap());
        handle.update_from_headers(&headers);

        tx.send(Message::RateLimit);
        dispatcher.tick();
        assert_eq!(dispatcher.state().rate_limit.remaining, Some(41));
        assert_eq!(
            dispatcher.state().rate_limit_display().unwrap(),
            "API Requests Remaining: 41"
        );
    }

    #[test]
    fn test_classify() {
        let exhausted = RateLimitState {
            remaining: Some(0),
            reset_at: chrono::DateTime::from_timestamp(1_700_000_000, 0),
        };
        let http = |status: u16| ApiError::Http {
            status,
            message: "nope".to_string(),
        };

        let notice = classify(&http(403), "octocat", &exhausted);
        assert_eq!(notice.title, "Rate Limit");
        assert!(notice.retryable);
        assert!(!notice.message.contains("unknown"));

        let notice = classify(&http(403), "octocat", &RateLimitState::default());
        assert_eq!(notice.title, "Access Denied");

        assert_eq!(
            classify(&http(401), "x", &RateLimitState::default()).title,
            "Unauthorized"
        );
        let notice = classify(&http(500), "x", &RateLimitState::default());
        assert_eq!(notice.title, "API Error");
        assert!(notice.retryable);
        assert_eq!(
            classify(
                &ApiError::Timeout("t".to_string()),
                "x",
                &RateLimitState::default()
            )
            .title,
            "Network Error"
        );
        assert_eq!(
            classify(
                &ApiError::Protocol("p".to_string()),
                "x",
                &RateLimitState::default()
            )
            .title,
            "Unexpected Response"
        );
        assert_eq!(
            classify(
                &ApiError::Validation("Please enter a name".to_string()),
                "",
                &RateLimitState::default()
            )
            .message,
            "Please enter a name"
        );
    }

    #[tokio::test]
    async fn test_run_until_finished() {
        let mut dispatcher = dispatcher();
        let tx = dispatcher.begin_session("octocat");
        tokio::spawn(async move {
            for i in 0..3 {
                tokio::time::sleep(Duration::from_millis(20)).await;
                tx.send(Message::Page(repos(i * 10, 10)));
            }
            tx.send(Message::Done);
        });

        dispatcher.run_until_finished(Duration::from_millis(5)).await;
        assert_eq!(dispatcher.state().phase, SessionPhase::Done);
        assert_eq!(dispatcher.state().records.len(), 30);
    }
}
