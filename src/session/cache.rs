use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use super::Session;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// In-memory cache of authenticated sessions, keyed by username
pub struct SessionCache {
    /// LRU cache mapping usernames to sessions
    cache: Arc<RwLock<LruCache<String, Arc<Session>>>>,
}

impl SessionCache {
    /// Create a new session cache with a maximum number of entries
    pub fn new(capacity: usize) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY));
        SessionCache {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Get a session from the cache
    pub fn get(&self, username: &str) -> Option<Arc<Session>> {
        let mut cache = self.cache.write().ok()?;
        cache.get(username).cloned()
    }

    /// Put a session into the cache
    pub fn put(&self, username: String, session: Arc<Session>) {
        if let Ok(mut cache) = self.cache.write() {
            cache.put(username, session);
        }
    }

    /// Forget a session
    pub fn remove(&self, username: &str) -> Option<Arc<Session>> {
        self.cache.write().ok()?.pop(username)
    }

    /// Get cache statistics
    pub fn len(&self) -> usize {
        self.cache.read().ok().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for SessionCache {
    fn clone(&self) -> Self {
        SessionCache {
            cache: Arc::clone(&self.cache),
        }
    }
}
