// Background fetch sessions.
// Worker task, message queue and the dispatcher that consumes it.

mod dispatcher;
mod message;
mod worker;

pub use dispatcher::{AvatarFetcher, Dispatcher, NoAvatar, classify};
pub use message::{CancelToken, Envelope, Message, Progress, SessionId, SessionSender};
pub use worker::{run_session, spawn_session};
