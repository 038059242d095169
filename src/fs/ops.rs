//! Filesystem capability trait.
//!
//! This is the surface a protocol server (or the shell) drives. Every call
//! carries a [`RequestContext`]; all paths are mount-relative except when the
//! implementation is a [`MountTable`](super::MountTable).

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;

use super::managers::{LockManager, PropertyManager};
use super::upload::UploadSink;
use crate::backend::ByteStream;
use crate::error::{DavError, DavResult};
use crate::session::Session;
use crate::vfs::{Permissions, ResourceKind, VirtualPath};

/// Per-request state handed to every operation
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session: Option<Arc<Session>>,
}

impl RequestContext {
    pub fn new(session: Arc<Session>) -> Self {
        RequestContext {
            session: Some(session),
        }
    }

    /// A request that carries no credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The authenticated session, or `BadAuthentication`
    pub fn session(&self) -> DavResult<&Arc<Session>> {
        self.session.as_ref().ok_or(DavError::BadAuthentication)
    }
}

/// One child in a directory listing
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: ResourceKind,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Permissions,
}

#[async_trait]
pub trait DavFileSystem: Send + Sync {
    /// Readable children of a directory
    async fn read_dir(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Vec<DirEntry>>;

    /// Stream a file's content
    async fn open_read(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<ByteStream>;

    /// Open a file for writing; content is committed by [`UploadSink::finish`]
    async fn open_write(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<UploadSink>;

    async fn resource_type(&self, ctx: &RequestContext, path: &VirtualPath)
    -> DavResult<ResourceKind>;

    /// Size in bytes; `None` when the backend has no value
    async fn size(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Option<u64>>;

    async fn creation_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>>;

    async fn last_modified_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>>;

    async fn create(&self, ctx: &RequestContext, path: &VirtualPath, kind: ResourceKind)
    -> DavResult<()>;

    async fn delete(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<()>;

    /// Rename in place, keeping the parent
    async fn rename(&self, ctx: &RequestContext, path: &VirtualPath, new_name: &str)
    -> DavResult<()>;

    async fn move_to(&self, ctx: &RequestContext, from: &VirtualPath, to: &VirtualPath)
    -> DavResult<()>;

    fn property_manager(&self) -> &PropertyManager;

    fn lock_manager(&self) -> &LockManager;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, ctx: &RequestContext, path: &VirtualPath) -> bool {
        self.resource_type(ctx, path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Bytes> {
        let stream = self.open_read(ctx, path).await?;
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        let mut buf = BytesMut::new();
        for chunk in chunks {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Write entire file contents, creating the file if needed.
    async fn write_all(&self, ctx: &RequestContext, path: &VirtualPath, data: Bytes) -> DavResult<()> {
        let mut sink = self.open_write(ctx, path).await?;
        sink.write(&data);
        sink.finish().await?;
        Ok(())
    }
}
