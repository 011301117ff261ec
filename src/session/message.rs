// Session queue messages.
// The only values that cross from the fetch worker to the dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ApiError;
use crate::github::{Profile, Repository};

/// Identifies one fetch session.
pub type SessionId = u64;

/// Progress indicator transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Start,
    Stop,
}

/// A message from the worker to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Status(String),
    Profile(Profile),
    Page(Vec<Repository>),
    /// Rate limit state changed; read it from the shared handle.
    RateLimit,
    Error(ApiError),
    Progress(Progress),
    Done,
}

impl Message {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Status(_) => "status",
            Message::Profile(_) => "profile",
            Message::Page(_) => "page",
            Message::RateLimit => "rate_limit",
            Message::Error(_) => "error",
            Message::Progress(_) => "progress",
            Message::Done => "done",
        }
    }
}

/// A message tagged with the session that produced it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub session: SessionId,
    pub message: Message,
}

/// Cancellation flag shared by a session's worker and the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer side of the queue for one session.
#[derive(Debug, Clone)]
pub struct SessionSender {
    session: SessionId,
    tx: UnboundedSender<Envelope>,
    cancel: CancelToken,
}

impl SessionSender {
    pub(crate) fn new(session: SessionId, tx: UnboundedSender<Envelope>, cancel: CancelToken) -> Self {
        Self {
            session,
            tx,
            cancel,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Enqueue a message. Returns false once the dispatcher is gone.
    pub fn send(&self, message: Message) -> bool {
        self.tx
            .send(Envelope {
                session: self.session,
                message,
            })
            .is_ok()
    }

    /// Whether a newer session has superseded this one.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
