//! In-memory property and lock managers.
//!
//! Protocol adapters store dead properties and lock records here. Nothing in
//! the filesystem core consults them; locks are recorded, never enforced.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::vfs::VirtualPath;

/// Arbitrary name/value properties attached to paths
#[derive(Debug, Default)]
pub struct PropertyManager {
    props: DashMap<VirtualPath, BTreeMap<String, String>>,
}

impl PropertyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &VirtualPath, name: impl Into<String>, value: impl Into<String>) {
        self.props
            .entry(path.clone())
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn get(&self, path: &VirtualPath, name: &str) -> Option<String> {
        self.props.get(path)?.get(name).cloned()
    }

    pub fn remove(&self, path: &VirtualPath, name: &str) -> Option<String> {
        self.props.get_mut(path)?.remove(name)
    }

    /// All properties of a path, sorted by name
    pub fn list(&self, path: &VirtualPath) -> Vec<(String, String)> {
        self.props
            .get(path)
            .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Follow a rename or move of `from` (and its subtree)
    pub fn rekey(&self, from: &VirtualPath, to: &VirtualPath) {
        let keys: Vec<VirtualPath> = self
            .props
            .iter()
            .filter(|e| e.key().starts_with(from))
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            if let Some((_, props)) = self.props.remove(&key) {
                if let Some(new_path) = key.rebase(from, to) {
                    self.props.insert(new_path, props);
                }
            }
        }
    }

    /// Drop everything recorded at or below `path`
    pub fn forget(&self, path: &VirtualPath) {
        self.props.retain(|key, _| !key.starts_with(path));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDepth {
    Zero,
    Infinity,
}

#[derive(Debug, Clone)]
pub struct LockRecord {
    pub token: String,
    pub owner: String,
    pub depth: LockDepth,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Lock records per path
#[derive(Debug, Default)]
pub struct LockManager {
    locks: DashMap<VirtualPath, Vec<LockRecord>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new lock and return it
    pub fn lock(
        &self,
        path: &VirtualPath,
        owner: impl Into<String>,
        depth: LockDepth,
        timeout: Duration,
    ) -> LockRecord {
        let record = LockRecord {
            token: format!("urn:uuid:{}", Uuid::new_v4()),
            owner: owner.into(),
            depth,
            expires_at: Utc::now() + timeout,
        };
        let mut entry = self.locks.entry(path.clone()).or_default();
        entry.retain(|l| !l.is_expired());
        entry.push(record.clone());
        record
    }

    /// Extend a lock; returns the refreshed record if the token is known
    pub fn refresh(&self, path: &VirtualPath, token: &str, timeout: Duration) -> Option<LockRecord> {
        let mut entry = self.locks.get_mut(path)?;
        let record = entry.iter_mut().find(|l| l.token == token && !l.is_expired())?;
        record.expires_at = Utc::now() + timeout;
        Some(record.clone())
    }

    pub fn unlock(&self, path: &VirtualPath, token: &str) -> bool {
        let Some(mut entry) = self.locks.get_mut(path) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| l.token != token);
        before != entry.len()
    }

    /// Unexpired locks recorded on `path`
    pub fn locks(&self, path: &VirtualPath) -> Vec<LockRecord> {
        self.locks
            .get(path)
            .map(|entry| entry.iter().filter(|l| !l.is_expired()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn forget(&self, path: &VirtualPath) {
        self.locks.retain(|key, _| !key.starts_with(path));
    }
}
