use crate::state::cache::ResponseCache;
use crate::state::fetch::{FetchHook, FetchState};
use crate::state::resources::FollowSuggestions;
use courtside_api::{ApiResult, RequestParams, SportsApi, UserProfile};
use log::{debug, warn};

/// Suggested users plus a server-confirmed follow/unfollow toggle.
///
/// A toggle patches only the affected profile in the current list; the list
/// is never refetched for it.
pub struct FollowHook {
    list: FetchHook<FollowSuggestions>,
    api: SportsApi,
    follower_id: u64,
}

impl FollowHook {
    pub fn mount(api: SportsApi, follower_id: u64, cache: ResponseCache<UserProfile>) -> Self {
        let list = FetchHook::mount(FollowSuggestions::new(api.clone()), cache);
        list.set_params(RequestParams::new().with("userId", follower_id));
        Self { list, api, follower_id }
    }

    pub fn list(&self) -> &FetchHook<FollowSuggestions> {
        &self.list
    }

    pub fn state(&self) -> FetchState<UserProfile> {
        self.list.state()
    }

    pub async fn refetch(&self) {
        self.list.refetch().await;
    }

    /// Flip the follow state for `followee_id` and return the server's answer.
    ///
    /// Failures are handed back to the caller and leave the list untouched;
    /// the list's `error` is reserved for load failures.
    pub async fn toggle(&self, followee_id: u64) -> ApiResult<bool> {
        match self.api.toggle_follow(self.follower_id, followee_id).await {
            Ok(is_following) => {
                debug!("user {followee_id} is_following={is_following}");
                self.list.patch(|users| {
                    if let Some(user) = users.iter_mut().find(|u| u.id == followee_id) {
                        user.is_following = is_following;
                    }
                });
                Ok(is_following)
            }
            Err(e) => {
                warn!("follow toggle for user {followee_id} failed: {e}");
                Err(e)
            }
        }
    }
}
