//! Fetch hooks and shared state for the courtside scores app.
//!
//! The wire formats, normalizer and HTTP client live in `courtside_api`; this
//! crate adds the response cache and the parameter-keyed, cancellable hooks
//! the screens read from.

pub mod state;

pub use state::app_settings::AppSettings;
pub use state::cache::ResponseCache;
pub use state::fetch::{FetchHook, FetchState, Resource};
pub use state::follow::FollowHook;
pub use state::refresher::PeriodicRefresher;
