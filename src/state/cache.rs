use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// (resource name, canonical params key)
pub type CacheKey = (&'static str, String);

/// Normalized responses keyed by resource and request parameters.
///
/// Constructed once at startup and handed to every hook that reads through it;
/// clones share storage. With a capacity, the least recently used entry is
/// evicted on overflow. Call [`clear`](Self::clear) on logout or reset.
#[derive(Debug)]
pub struct ResponseCache<T> {
    inner: Arc<Mutex<LruCache<CacheKey, Vec<T>>>>,
}

impl<T> Clone for ResponseCache<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseCache<T> {
    /// Unbounded: one key holds one list for the life of the cache.
    pub fn new() -> Self {
        Self::build(LruCache::unbounded())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self::build(LruCache::new(capacity))
    }

    /// `None` means unbounded.
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) => Self::with_capacity(n),
            None => Self::new(),
        }
    }

    fn build(entries: LruCache<CacheKey, Vec<T>>) -> Self {
        Self { inner: Arc::new(Mutex::new(entries)) }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Vec<T>>> {
        // Entries stay consistent across a panicking reader.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Presence check; does not count as a use.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    pub fn insert(&self, key: CacheKey, value: Vec<T>) {
        let displaced = self.lock().push(key.clone(), value);
        if let Some((evicted, _)) = displaced.filter(|(old, _)| *old != key) {
            log::debug!("evicted cached response {evicted:?}");
        }
    }

    /// Patch a cached list in place. Returns false when the key is absent.
    pub fn update<F>(&self, key: &CacheKey, f: F) -> bool
    where
        F: FnOnce(&mut Vec<T>),
    {
        match self.lock().get_mut(key) {
            Some(list) => {
                f(list);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<T: Clone> ResponseCache<T> {
    pub fn get(&self, key: &CacheKey) -> Option<Vec<T>> {
        self.lock().get(key).cloned()
    }
}
