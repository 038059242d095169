use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Kind of a backend object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Directory,
    File,
}

impl ResourceKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, ResourceKind::Directory)
    }
}

/// Effective permission bit-set of one user on one object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub delete: bool,
}

impl Permissions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Permissions {
            read: true,
            write: true,
            create: true,
            delete: true,
        }
    }

    pub fn read_only() -> Self {
        Permissions {
            read: true,
            ..Self::default()
        }
    }

    /// OR every bit of `other` into `self`
    pub fn grant(&mut self, other: Permissions) {
        self.read |= other.read;
        self.write |= other.write;
        self.create |= other.create;
        self.delete |= other.delete;
    }
}

/// Cached metadata for one backend object at one path, for one user
#[derive(Debug, Clone)]
pub struct Resource {
    /// Opaque backend id
    pub id: String,
    pub kind: ResourceKind,
    /// Size in bytes, `None` when the backend reports none (or a negative value)
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub permissions: Permissions,
    /// Role of the user inside the team / course this entry represents
    pub scope_role: Option<String>,
    /// Backend owner id recorded on the object
    pub owner: Option<String>,
    /// Backend creator id recorded on the object
    pub creator: Option<String>,
    /// Top-level entry whose permissions are resolved on first descent
    pub pending: bool,
    /// When this entry was last loaded from the backend
    pub loaded_at: Instant,
}

impl Resource {
    /// A bare directory known only by id (synthesized top-level entries)
    pub fn directory(id: impl Into<String>) -> Self {
        Resource {
            id: id.into(),
            kind: ResourceKind::Directory,
            size: None,
            created_at: None,
            updated_at: None,
            permissions: Permissions::none(),
            scope_role: None,
            owner: None,
            creator: None,
            pending: false,
            loaded_at: Instant::now(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Whether the metadata is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() > ttl
    }

    /// Whether `uid` is the recorded owner or creator of this object
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner.as_deref() == Some(uid) || self.creator.as_deref() == Some(uid)
    }
}
