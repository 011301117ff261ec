// State management module.
// Observable session state, the repository view and derived statistics.

pub mod fetch;
pub mod insights;
pub mod view;

pub use fetch::{ErrorNotice, FetchState, SessionPhase};
pub use insights::{Insights, last_activity};
pub use view::{RepoView, SortColumn, SortState};
