//! Mount table routing full paths to mounts.
//!
//! `/courses/Biology/notes.txt` is routed to the `courses` mount with the
//! mount-relative path `/Biology/notes.txt`. The table root lists the mounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::{
    DavFileSystem, DirEntry, LockManager, MountFs, PropertyManager, RequestContext, UploadSink,
};
use crate::backend::{Backend, BlobStore, ByteStream};
use crate::error::{DavError, DavResult};
use crate::mounts::ViewRegistry;
use crate::vfs::{Permissions, ResourceKind, VirtualPath};

pub struct MountTable {
    mounts: BTreeMap<String, MountFs>,
    props: PropertyManager,
    locks: LockManager,
}

impl std::fmt::Debug for MountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountTable")
            .field("mounts", &self.names())
            .finish()
    }
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    /// Create a new empty mount table.
    pub fn new() -> Self {
        MountTable {
            mounts: BTreeMap::new(),
            props: PropertyManager::new(),
            locks: LockManager::new(),
        }
    }

    /// One mount per built-in view, each with its own cache
    pub fn standard(
        backend: Arc<dyn Backend>,
        blobs: Arc<dyn BlobStore>,
        metadata_ttl: Duration,
    ) -> Self {
        let registry = ViewRegistry::new();
        let mut table = Self::new();
        for name in registry.list() {
            if let Some(view) = registry.get(name) {
                table.mount(MountFs::new(
                    view,
                    Arc::clone(&backend),
                    Arc::clone(&blobs),
                    metadata_ttl,
                ));
            }
        }
        table
    }

    /// Mount a filesystem under its own name, replacing any previous one.
    pub fn mount(&mut self, fs: MountFs) {
        self.mounts.insert(fs.name().to_string(), fs);
    }

    pub fn get(&self, name: &str) -> Option<&MountFs> {
        self.mounts.get(name)
    }

    /// Mount names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.mounts.keys().map(|s| s.as_str()).collect()
    }

    /// Split a full path into its mount and the mount-relative remainder.
    ///
    /// Returns `None` for the table root.
    pub fn route(&self, path: &VirtualPath) -> DavResult<Option<(&MountFs, VirtualPath)>> {
        let Some(first) = path.segments().first() else {
            return Ok(None);
        };
        let fs = self
            .mounts
            .get(first)
            .ok_or_else(|| DavError::not_found(path.to_string()))?;
        let rest = VirtualPath::from_segments(path.segments()[1..].to_vec());
        Ok(Some((fs, rest)))
    }

    fn routed(&self, path: &VirtualPath) -> DavResult<(&MountFs, VirtualPath)> {
        self.route(path)?
            .ok_or_else(|| DavError::forbidden(path.to_string()))
    }
}

#[async_trait]
impl DavFileSystem for MountTable {
    async fn read_dir(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Vec<DirEntry>> {
        ctx.session()?;
        match self.route(path)? {
            Some((fs, rest)) => fs.read_dir(ctx, &rest).await,
            None => Ok(self
                .mounts
                .keys()
                .map(|name| DirEntry {
                    name: name.clone(),
                    kind: ResourceKind::Directory,
                    size: None,
                    modified: None,
                    permissions: Permissions::read_only(),
                })
                .collect()),
        }
    }

    async fn open_read(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<ByteStream> {
        match self.route(path)? {
            Some((fs, rest)) => fs.open_read(ctx, &rest).await,
            None => Err(DavError::invalid_operation("/ is a directory")),
        }
    }

    async fn open_write(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<UploadSink> {
        let (fs, rest) = self.routed(path)?;
        fs.open_write(ctx, &rest).await
    }

    async fn resource_type(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<ResourceKind> {
        ctx.session()?;
        match self.route(path)? {
            Some((fs, rest)) => fs.resource_type(ctx, &rest).await,
            None => Ok(ResourceKind::Directory),
        }
    }

    async fn size(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Option<u64>> {
        ctx.session()?;
        match self.route(path)? {
            Some((fs, rest)) => fs.size(ctx, &rest).await,
            None => Ok(None),
        }
    }

    async fn creation_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>> {
        ctx.session()?;
        match self.route(path)? {
            Some((fs, rest)) => fs.creation_date(ctx, &rest).await,
            None => Ok(None),
        }
    }

    async fn last_modified_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>> {
        ctx.session()?;
        match self.route(path)? {
            Some((fs, rest)) => fs.last_modified_date(ctx, &rest).await,
            None => Ok(None),
        }
    }

    async fn create(&self, ctx: &RequestContext, path: &VirtualPath, kind: ResourceKind) -> DavResult<()> {
        let (fs, rest) = self.routed(path)?;
        fs.create(ctx, &rest, kind).await
    }

    async fn delete(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<()> {
        let (fs, rest) = self.routed(path)?;
        fs.delete(ctx, &rest).await
    }

    async fn rename(&self, ctx: &RequestContext, path: &VirtualPath, new_name: &str) -> DavResult<()> {
        let (fs, rest) = self.routed(path)?;
        fs.rename(ctx, &rest, new_name).await
    }

    async fn move_to(&self, ctx: &RequestContext, from: &VirtualPath, to: &VirtualPath) -> DavResult<()> {
        let (src, from_rest) = self.routed(from)?;
        let (dst, to_rest) = self.routed(to)?;
        if src.name() != dst.name() {
            return Err(DavError::forbidden(format!("{from} -> {to} crosses mounts")));
        }
        src.move_to(ctx, &from_rest, &to_rest).await
    }

    fn property_manager(&self) -> &PropertyManager {
        &self.props
    }

    fn lock_manager(&self) -> &LockManager {
        &self.locks
    }
}
