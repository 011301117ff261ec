// Observable fetch state.
// Everything the presentation layer reads; written only by the dispatcher.

use chrono::{DateTime, Utc};

use crate::github::{Profile, RateLimitState, Repository};

use super::insights::Insights;
use super::view::RepoView;

/// Lifecycle of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    Done,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Done | SessionPhase::Failed)
    }
}

/// A classified error ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    /// Whether offering a retry makes sense.
    pub retryable: bool,
}

/// State of the current fetch session.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    /// Account name the session was started for.
    pub name: String,
    pub phase: SessionPhase,
    /// Accumulated records, in arrival order. Append-only during a session.
    pub records: Vec<Repository>,
    pub view: RepoView,
    pub profile: Option<Profile>,
    pub status: String,
    /// Progress indicator.
    pub busy: bool,
    pub rate_limit: RateLimitState,
    pub last_error: Option<ErrorNotice>,
    /// Most recent push across all records, set when the session completes.
    pub last_activity: Option<DateTime<Utc>>,
    pub insights: Option<Insights>,
    /// Pages received this session.
    pub pages: usize,
}

impl FetchState {
    /// Fresh idle state for `name`. The view keeps its page size.
    pub fn reset(&mut self, name: &str) {
        let mut view = std::mem::take(&mut self.view);
        view.reset();
        *self = Self {
            name: name.to_string(),
            view,
            rate_limit: self.rate_limit,
            ..Self::default()
        };
    }

    /// Rows on the current display page.
    pub fn page_items(&self) -> Vec<&Repository> {
        self.view.page_items(&self.records)
    }

    pub fn rate_limit_display(&self) -> Option<String> {
        self.rate_limit
            .remaining
            .map(|remaining| format!("API Requests Remaining: {}", remaining))
    }

    pub fn last_activity_display(&self) -> String {
        match self.last_activity {
            Some(at) => format!(
                "Last Commit: {}",
                at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S %Z")
            ),
            None => "Last Commit: -".to_string(),
        }
    }
}
