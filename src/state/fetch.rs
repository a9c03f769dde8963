use crate::state::cache::{CacheKey, ResponseCache};
use courtside_api::{ApiResult, RequestParams};
use futures_util::future::{AbortHandle, Abortable, BoxFuture};
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A backend list a [`FetchHook`] can load.
pub trait Resource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Cache namespace.
    fn name(&self) -> &'static str;

    /// Fields that must be defined before any request goes out.
    fn required(&self) -> &'static [&'static str];

    fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, ApiResult<Vec<Self::Item>>>;
}

/// What the view layer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

#[derive(Debug, Default)]
struct Inflight {
    /// Bumped whenever the current request is superseded; a completion only
    /// commits if its generation is still current.
    generation: u64,
    params: Option<RequestParams>,
    last_attempted: Option<CacheKey>,
    active_key: Option<CacheKey>,
    abort: Option<AbortHandle>,
}

impl Inflight {
    fn supersede(&mut self) -> u64 {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        self.generation += 1;
        self.generation
    }
}

struct Shared<T> {
    state: watch::Sender<FetchState<T>>,
    inflight: Mutex<Inflight>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inflight> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parameter-keyed, cancellable fetch with a shared response cache.
///
/// Constructing the hook mounts it; dropping it unmounts it and cancels the
/// request in flight. Every method that may start a request must be called
/// from within a Tokio runtime.
pub struct FetchHook<R: Resource> {
    resource: Arc<R>,
    cache: ResponseCache<R::Item>,
    shared: Arc<Shared<R::Item>>,
}

impl<R: Resource> FetchHook<R> {
    pub fn mount(resource: R, cache: ResponseCache<R::Item>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            resource: Arc::new(resource),
            cache,
            shared: Arc::new(Shared { state, inflight: Mutex::new(Inflight::default()) }),
        }
    }

    pub fn state(&self) -> FetchState<R::Item> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<R::Item>> {
        self.shared.state.subscribe()
    }

    pub fn params(&self) -> Option<RequestParams> {
        self.shared.lock().params.clone()
    }

    /// Wait until no request of this hook is loading.
    pub async fn settled(&self) -> FetchState<R::Item> {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Apply new parameters: serve from cache, skip a repeat, or start one
    /// request. Parameters missing a required field are ignored.
    pub fn set_params(&self, params: RequestParams) {
        let name = self.resource.name();
        if !params.has_all(self.resource.required()) {
            debug!("{name}: required params missing, not fetching");
            return;
        }

        let key = self.key(&params);

        if let Some(cached) = self.cache.get(&key) {
            debug!("{name}: cache hit for {}", key.1);
            let mut inflight = self.shared.lock();
            inflight.supersede();
            inflight.params = Some(params);
            inflight.active_key = Some(key.clone());
            inflight.last_attempted = Some(key);
            self.shared.state.send_modify(|s| {
                s.data = Some(cached);
                s.error = None;
                s.loading = false;
            });
            return;
        }

        if self.shared.lock().last_attempted.as_ref() == Some(&key) {
            debug!("{name}: {} already attempted, skipping", key.1);
            return;
        }

        self.start(params, key);
    }

    /// Re-run the fetch for the current parameters, bypassing the cache
    /// lookup. Resolves once that request settles or is superseded.
    pub async fn refetch(&self) {
        let name = self.resource.name();
        let Some(params) = self.params() else {
            debug!("{name}: refetch before params were set");
            return;
        };
        let key = self.key(&params);
        if let Err(e) = self.start(params, key).await {
            error!("{name}: refetch task failed: {e}");
        }
    }

    /// Patch the current list in place, and the cached list it came from.
    pub fn patch<F>(&self, f: F)
    where
        F: Fn(&mut Vec<R::Item>),
    {
        let active_key = self.shared.lock().active_key.clone();
        if let Some(key) = active_key {
            self.cache.update(&key, &f);
        }
        self.shared.state.send_modify(|s| {
            if let Some(list) = s.data.as_mut() {
                f(list);
            }
        });
    }

    fn key(&self, params: &RequestParams) -> CacheKey {
        (self.resource.name(), params.cache_key())
    }

    fn start(&self, params: RequestParams, key: CacheKey) -> JoinHandle<()> {
        let name = self.resource.name();
        let (abort, registration) = AbortHandle::new_pair();
        let request = Abortable::new(self.resource.fetch(&params), registration);

        let generation = {
            let mut inflight = self.shared.lock();
            let generation = inflight.supersede();
            inflight.abort = Some(abort);
            inflight.params = Some(params);
            inflight.active_key = Some(key.clone());
            inflight.last_attempted = Some(key.clone());
            self.shared.state.send_modify(|s| s.loading = true);
            generation
        };
        debug!("{name}: fetching {} (generation {generation})", key.1);

        let shared = Arc::clone(&self.shared);
        let cache = self.cache.clone();
        tokio::spawn(async move {
            match request.await {
                Ok(result) => commit(&shared, &cache, generation, key, result),
                Err(_aborted) => debug!("{name}: generation {generation} cancelled"),
            }
        })
    }
}

impl<R: Resource> Drop for FetchHook<R> {
    fn drop(&mut self) {
        self.shared.lock().supersede();
    }
}

fn commit<T: Clone>(
    shared: &Shared<T>,
    cache: &ResponseCache<T>,
    generation: u64,
    key: CacheKey,
    result: ApiResult<Vec<T>>,
) {
    let name = key.0;
    let mut inflight = shared.lock();
    if inflight.generation != generation {
        debug!("{name}: dropping stale response for {}", key.1);
        return;
    }
    inflight.abort = None;

    match result {
        Ok(items) => {
            debug!("{name}: {} items for {}", items.len(), key.1);
            cache.insert(key, items.clone());
            shared.state.send_modify(|s| {
                s.data = Some(items);
                s.error = None;
                s.loading = false;
            });
        }
        Err(e) => {
            error!("{name}: {e}");
            let message = e.user_message();
            shared.state.send_modify(|s| {
                s.error = Some(message);
                s.loading = false;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_api::ApiError;
    use courtside_api::client::StatusCode;
    use futures_util::FutureExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Reply = ApiResult<Vec<String>>;

    /// Resource whose responses are released by the test, keyed by `team1`.
    #[derive(Default)]
    struct Gated {
        pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
        calls: AtomicUsize,
    }

    impl Gated {
        fn expect(&self, team: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().insert(team.to_owned(), rx);
            tx
        }
    }

    impl Resource for Arc<Gated> {
        type Item = String;

        fn name(&self) -> &'static str {
            "gated"
        }

        fn required(&self) -> &'static [&'static str] {
            &["date"]
        }

        fn fetch(&self, params: &RequestParams) -> BoxFuture<'static, Reply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let team = params.get("team1").map(|v| v.to_string()).unwrap_or_default();
            let rx = self.pending.lock().unwrap().remove(&team);
            async move {
                match rx {
                    Some(rx) => rx.await.unwrap_or_else(|_| Err(ApiError::Other("dropped".into()))),
                    None => Ok(vec![format!("instant:{team}")]),
                }
            }
            .boxed()
        }
    }

    fn params(team: &str) -> RequestParams {
        RequestParams::new().with("date", "2025-01-01").with("team1", team)
    }

    async fn let_tasks_run() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn missing_required_field_does_nothing() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());

        hook.set_params(RequestParams::new().with("team1", "A"));
        let_tasks_run().await;

        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
        assert_eq!(hook.state(), FetchState::default());
        assert!(hook.params().is_none());
    }

    #[tokio::test]
    async fn success_fills_data_and_cache() {
        let gated = Arc::new(Gated::default());
        let cache = ResponseCache::new();
        let hook = FetchHook::mount(gated.clone(), cache.clone());

        hook.set_params(params("A"));
        assert!(hook.state().loading);
        let state = hook.settled().await;

        assert_eq!(state.data, Some(vec!["instant:A".to_owned()]));
        assert!(state.error.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn second_hook_is_served_from_cache() {
        let gated = Arc::new(Gated::default());
        let cache = ResponseCache::new();

        let first = FetchHook::mount(gated.clone(), cache.clone());
        first.set_params(params("A"));
        first.settled().await;
        drop(first);

        let second = FetchHook::mount(gated.clone(), cache.clone());
        second.set_params(params("A"));
        let state = second.state();

        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.data, Some(vec!["instant:A".to_owned()]));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn repeated_params_do_not_duplicate_in_flight_request() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());
        let reply = gated.expect("A");

        hook.set_params(params("A"));
        hook.set_params(params("A"));
        let_tasks_run().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);

        reply.send(Ok(vec!["a".into()])).unwrap();
        assert_eq!(hook.settled().await.data, Some(vec!["a".to_owned()]));
    }

    #[tokio::test]
    async fn only_latest_params_commit() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());
        let reply_a = gated.expect("A");
        let reply_b = gated.expect("B");

        hook.set_params(params("A"));
        let_tasks_run().await;
        hook.set_params(params("B"));
        let_tasks_run().await;

        // A was aborted; its sender may already be closed.
        let _ = reply_a.send(Ok(vec!["a".into()]));
        let_tasks_run().await;
        assert!(hook.state().data.is_none());
        assert!(hook.state().loading);

        reply_b.send(Ok(vec!["b".into()])).unwrap();
        let state = hook.settled().await;
        assert_eq!(state.data, Some(vec!["b".to_owned()]));
    }

    #[tokio::test]
    async fn superseded_failure_is_not_shown() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());
        let reply_a = gated.expect("A");
        let reply_b = gated.expect("B");

        hook.set_params(params("A"));
        let_tasks_run().await;
        hook.set_params(params("B"));
        let _ = reply_a.send(Err(ApiError::Other("connection reset".into())));
        let_tasks_run().await;
        assert!(hook.state().error.is_none());

        reply_b.send(Ok(vec!["b".into()])).unwrap();
        let state = hook.settled().await;
        assert!(state.error.is_none());
        assert_eq!(state.data, Some(vec!["b".to_owned()]));
    }

    #[tokio::test]
    async fn stale_completion_never_overwrites_newer_data() {
        let gated = Arc::new(Gated::default());
        let shared_cache = ResponseCache::new();
        let hook = FetchHook::mount(gated.clone(), shared_cache.clone());

        // B is cached, so switching to it supersedes A without a request.
        shared_cache.insert(("gated", params("B").cache_key()), vec!["cached-b".to_owned()]);
        let reply_a = gated.expect("A");

        hook.set_params(params("A"));
        let_tasks_run().await;
        hook.set_params(params("B"));
        let _ = reply_a.send(Ok(vec!["a".into()]));
        let_tasks_run().await;

        let state = hook.state();
        assert_eq!(state.data, Some(vec!["cached-b".to_owned()]));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn response_after_unmount_changes_nothing() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());
        let reply = gated.expect("A");
        let rx = hook.subscribe();

        hook.set_params(params("A"));
        let_tasks_run().await;
        let before = rx.borrow().clone();
        drop(hook);

        let _ = reply.send(Ok(vec!["late".into()]));
        let_tasks_run().await;

        assert_eq!(*rx.borrow(), before);
        assert!(rx.borrow().data.is_none());
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());

        hook.set_params(params("A"));
        hook.settled().await;

        let reply = gated.expect("B");
        hook.set_params(params("B"));
        let_tasks_run().await;
        reply
            .send(Err(ApiError::Server {
                status: StatusCode::BAD_GATEWAY,
                message: Some("Feed is down".into()),
                url: "http://test/games".into(),
            }))
            .unwrap();

        let state = hook.settled().await;
        assert_eq!(state.error.as_deref(), Some("Feed is down"));
        assert_eq!(state.data, Some(vec!["instant:A".to_owned()]));
    }

    #[tokio::test]
    async fn refetch_bypasses_cache_and_recovers() {
        let gated = Arc::new(Gated::default());
        let cache = ResponseCache::new();
        let hook = FetchHook::mount(gated.clone(), cache.clone());

        let failing = gated.expect("A");
        hook.set_params(params("A"));
        let_tasks_run().await;
        failing.send(Err(ApiError::Other("boom".into()))).unwrap();
        let state = hook.settled().await;
        assert!(state.error.is_some());

        // Same params again are skipped; refetch is the retry path.
        hook.set_params(params("A"));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);

        tokio::time::timeout(Duration::from_secs(1), hook.refetch())
            .await
            .expect("refetch should settle");
        let state = hook.state();
        assert_eq!(state.data, Some(vec!["instant:A".to_owned()]));
        assert!(state.error.is_none());
        assert_eq!(gated.calls.load(Ordering::SeqCst), 2);

        hook.refetch().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 3, "refetch ignores the cache");
    }

    #[tokio::test]
    async fn refetch_without_params_is_a_no_op() {
        let gated = Arc::new(Gated::default());
        let hook = FetchHook::mount(gated.clone(), ResponseCache::new());
        hook.refetch().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn patch_updates_state_and_cache() {
        let gated = Arc::new(Gated::default());
        let cache = ResponseCache::new();
        let hook = FetchHook::mount(gated.clone(), cache.clone());
        hook.set_params(params("A"));
        hook.settled().await;

        hook.patch(|list| list.push("patched".into()));

        let expected = vec!["instant:A".to_owned(), "patched".to_owned()];
        assert_eq!(hook.state().data, Some(expected.clone()));
        assert_eq!(cache.get(&("gated", params("A").cache_key())), Some(expected));
    }
}
