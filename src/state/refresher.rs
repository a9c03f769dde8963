use crate::state::fetch::{FetchHook, FetchState, Resource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

pub const LIVE_REFRESH: Duration = Duration::from_secs(30);

/// Periodic refetch of a list hook, e.g. live scores every 30 seconds.
/// The hook's own params decide what is fetched; the initial load is left to
/// whoever set them.
pub struct PeriodicRefresher<R: Resource> {
    hook: Arc<FetchHook<R>>,
    interval: Interval,
}

impl<R: Resource> PeriodicRefresher<R> {
    pub fn new(hook: Arc<FetchHook<R>>, every: Duration) -> Self {
        let mut interval = interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { hook, interval }
    }

    /// Wait for the next period, refetch, and return the settled state.
    pub async fn tick(&mut self) -> FetchState<R::Item> {
        self.interval.tick().await;
        self.hook.refetch().await;
        self.hook.state()
    }

    pub async fn run<F>(mut self, mut on_update: F)
    where
        F: FnMut(&FetchState<R::Item>),
    {
        // Skip the immediate first tick so the initial load isn't doubled.
        self.interval.tick().await;
        loop {
            let state = self.tick().await;
            on_update(&state);
        }
    }
}
