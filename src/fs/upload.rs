//! Two-phase upload pipeline.
//!
//! Bytes written to an [`UploadSink`] are buffered until [`UploadSink::finish`],
//! which then runs three steps: request a signed write URL, push the bytes to
//! the blob store, and register (or update) the metadata at the backend.

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::io::AsyncWrite;
use tracing::{debug, error, info, warn};

use super::MountInner;
use super::names::mime_for;
use crate::backend::{ListScope, RegisterFile, UploadTarget};
use crate::error::{DavError, DavResult};
use crate::session::Session;
use crate::vfs::{Resource, VirtualPath};

/// What the finished upload turns into
pub(crate) enum UploadPlan {
    /// Replace the content of an existing file
    Replace { resource: Resource },
    /// Register a new file under `parent`
    Create {
        parent: VirtualPath,
        parent_res: Resource,
        scope: ListScope,
        filename: String,
    },
}

/// Write handle returned by `open_write`
pub struct UploadSink {
    mount: Arc<MountInner>,
    session: Arc<Session>,
    path: VirtualPath,
    plan: UploadPlan,
    buffer: BytesMut,
}

impl UploadSink {
    pub(crate) fn new(
        mount: Arc<MountInner>,
        session: Arc<Session>,
        path: VirtualPath,
        plan: UploadPlan,
    ) -> Self {
        UploadSink {
            mount,
            session,
            path,
            plan,
            buffer: BytesMut::new(),
        }
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Whether the target did not exist when the sink was opened
    pub fn creates(&self) -> bool {
        matches!(self.plan, UploadPlan::Create { .. })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Commit the buffered content and return the resulting resource
    pub async fn finish(self) -> DavResult<Resource> {
        let body = self.buffer.freeze();
        run(&self.mount, &self.session, &self.path, self.plan, body).await
    }
}

impl AsyncWrite for UploadSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub(crate) async fn run(
    mount: &MountInner,
    session: &Session,
    path: &VirtualPath,
    plan: UploadPlan,
    body: Bytes,
) -> DavResult<Resource> {
    let uid = session.uid.as_str();
    let size = body.len() as u64;
    let target = match &plan {
        UploadPlan::Replace { resource } => UploadTarget::Existing {
            id: resource.id.clone(),
        },
        UploadPlan::Create {
            scope, filename, ..
        } => UploadTarget::New {
            scope: scope.clone(),
            filename: filename.clone(),
            mime: mime_for(filename).to_string(),
        },
    };

    debug!(user = %uid, mount = %mount.name, path = %path, size, "upload: request-url");
    let signed = mount
        .backend
        .signed_upload_url(session, &target)
        .await
        .map_err(|e| {
            error!(user = %uid, mount = %mount.name, path = %path, error = %e, "upload: signed url request failed");
            DavError::forbidden(path.to_string())
        })?;

    debug!(user = %uid, mount = %mount.name, path = %path, size, "upload: upload-bytes");
    if let Err(e) = mount.blobs.put(&signed, body).await {
        warn!(user = %uid, mount = %mount.name, path = %path, error = %e, "upload: blob store rejected content");
    }

    debug!(user = %uid, mount = %mount.name, path = %path, size, "upload: register");
    let resource = match plan {
        UploadPlan::Replace { resource } => {
            let obj = mount
                .backend
                .update_size(session, &resource.id, size)
                .await
                .map_err(|e| {
                    error!(user = %uid, mount = %mount.name, path = %path, id = %resource.id, error = %e, "upload: size update failed");
                    DavError::forbidden(path.to_string())
                })?;
            let updated_at = obj.updated_at.or_else(|| Some(Utc::now()));
            let now = Instant::now();
            mount.resolver.cache().update(uid, path, |res| {
                res.size = Some(size);
                res.updated_at = updated_at;
                res.loaded_at = now;
            });
            Resource {
                size: Some(size),
                updated_at,
                loaded_at: now,
                ..resource
            }
        }
        UploadPlan::Create {
            parent,
            parent_res,
            scope,
            filename,
        } => {
            let req = RegisterFile {
                storage_file_name: signed.storage_name().unwrap_or(&filename).to_string(),
                mime: mime_for(&filename).to_string(),
                name: filename,
                owner: scope.owner,
                parent: scope.parent,
                size,
            };
            let obj = mount.backend.register_file(session, &req).await.map_err(|e| {
                error!(user = %uid, mount = %mount.name, path = %path, error = %e, "upload: registration failed");
                DavError::forbidden(path.to_string())
            })?;
            let resource = mount.adopt(session, &parent, &parent_res, obj).await;
            if !mount.resolver.cache().put(uid, path, resource.clone()) {
                debug!(user = %uid, path = %path, "parent evicted before registration finished");
            }
            resource
        }
    };

    info!(user = %uid, mount = %mount.name, path = %path, id = %resource.id, size, "upload complete");
    Ok(resource)
}
