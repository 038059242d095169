//! Mount filesystems and the operation handlers behind them.
//!
//! A [`MountFs`] serves one collection (personal, courses, teams, shared)
//! and owns that collection's resource cache. Handlers resolve the target
//! through the [`PathResolver`], check permissions locally, call the backend,
//! and then update the cache.

pub mod managers;
pub mod names;
pub mod ops;
pub mod table;
pub mod upload;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::{Backend, BlobStore, ByteStream, FileObject, NewObject};
use crate::error::{BackendError, DavError, DavResult};
use crate::mounts::RootView;
use crate::session::{FILE_DELETE, Session};
use crate::vfs::{PathResolver, Resource, ResourceCache, ResourceKind, VirtualPath};

pub use managers::{LockDepth, LockManager, LockRecord, PropertyManager};
pub use names::{is_office_document, mime_for, validate_name};
pub use ops::{DavFileSystem, DirEntry, RequestContext};
pub use table::MountTable;
pub use upload::UploadSink;

use upload::UploadPlan;

pub(crate) struct MountInner {
    pub(crate) name: String,
    pub(crate) resolver: PathResolver,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    props: PropertyManager,
    locks: LockManager,
}

/// One mounted collection
#[derive(Clone)]
pub struct MountFs {
    inner: Arc<MountInner>,
}

impl MountFs {
    pub fn new(
        view: Arc<dyn RootView>,
        backend: Arc<dyn Backend>,
        blobs: Arc<dyn BlobStore>,
        metadata_ttl: Duration,
    ) -> Self {
        let name = view.name().to_string();
        let resolver = PathResolver::new(
            view,
            Arc::clone(&backend),
            ResourceCache::new(),
            metadata_ttl,
        );
        MountFs {
            inner: Arc::new(MountInner {
                name,
                resolver,
                backend,
                blobs,
                props: PropertyManager::new(),
                locks: LockManager::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        self.inner.resolver.view().description()
    }

    /// The per-user resource cache of this mount
    pub fn cache(&self) -> &ResourceCache {
        self.inner.resolver.cache()
    }

    /// Materialize `path` for the request's user
    pub async fn load_path(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<bool> {
        let session = ctx.session()?;
        self.inner.resolver.load_path(session, path).await
    }

    fn resolver(&self) -> &PathResolver {
        &self.inner.resolver
    }

    /// Reject operations on the mount root and on synthesized entries
    fn require_real(&self, path: &VirtualPath) -> DavResult<()> {
        if path.is_root() || self.resolver().view().is_virtual(path) {
            return Err(DavError::forbidden(path.to_string()));
        }
        Ok(())
    }

    /// Resolve the parent directory of `path` for creating a child there
    async fn creatable_parent(
        &self,
        session: &Session,
        path: &VirtualPath,
    ) -> DavResult<(VirtualPath, Resource)> {
        let parent = path
            .parent()
            .ok_or_else(|| DavError::forbidden(path.to_string()))?;
        let parent_res = self.resolver().resolve(session, &parent).await?;
        if !parent_res.is_dir() {
            return Err(DavError::invalid_operation(format!("{parent} is not a directory")));
        }
        if !parent_res.permissions.create {
            return Err(DavError::forbidden(path.to_string()));
        }
        Ok((parent, parent_res))
    }

    /// Fail with `ResourceAlreadyExists` when `path` resolves
    async fn ensure_absent(&self, session: &Session, path: &VirtualPath) -> DavResult<()> {
        if self.resolver().load_path(session, path).await? {
            return Err(DavError::already_exists(path.to_string()));
        }
        Ok(())
    }

    fn rename_error(&self, err: BackendError, user: &str, path: &VirtualPath) -> DavError {
        let rejected = matches!(err, BackendError::Status { .. })
            && !err.is_not_found()
            && !err.is_forbidden();
        if rejected {
            return DavError::invalid_operation(err.to_string());
        }
        self.resolver().classify(err, user, path)
    }

    /// Rekey `from` to `to`, dropping `from` if the rekey is impossible
    fn relocate(&self, user: &str, from: &VirtualPath, to: &VirtualPath) {
        if !self.cache().move_key(user, from, to) {
            self.cache().delete(user, from);
        }
        self.inner.props.rekey(from, to);
        self.inner.locks.forget(from);
    }
}

impl MountInner {
    /// Cache entry for an object the backend just created under `parent`
    ///
    /// Creation responses may omit the permission entries; the object is then
    /// fetched again, and if it still carries none it inherits the parent's.
    pub(crate) async fn adopt(
        &self,
        session: &Session,
        parent: &VirtualPath,
        parent_res: &Resource,
        obj: FileObject,
    ) -> Resource {
        let obj = if obj.permissions.is_empty() {
            match self.backend.get_file(session, &obj.id).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    debug!(user = %session.uid, id = %obj.id, error = %e, "refetch of created object failed");
                    obj
                }
            }
        } else {
            obj
        };
        let inherit = obj.permissions.is_empty();
        let mut resource = self.resolver.hydrate_below(session, parent, obj);
        if inherit {
            resource.permissions = parent_res.permissions;
        }
        resource
    }
}

fn entry(name: String, res: &Resource) -> DirEntry {
    DirEntry {
        name,
        kind: res.kind,
        size: res.size,
        modified: res.updated_at,
        permissions: res.permissions,
    }
}

#[async_trait]
impl DavFileSystem for MountFs {
    async fn read_dir(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Vec<DirEntry>> {
        let session = ctx.session()?;
        if path.is_root() {
            let listing = self.resolver().load_directory(session, path).await?;
            return Ok(listing
                .into_iter()
                .map(|(name, res)| entry(name, &res))
                .collect());
        }

        let dir = self.resolver().resolve(session, path).await?;
        if !dir.is_dir() {
            return Err(DavError::invalid_operation(format!("{path} is not a directory")));
        }
        let listing = self.resolver().load_directory(session, path).await?;
        Ok(listing
            .into_iter()
            .filter(|(_, res)| res.permissions.read)
            .map(|(name, res)| entry(name, &res))
            .collect())
    }

    async fn open_read(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<ByteStream> {
        let session = ctx.session()?;
        let res = self.resolver().resolve(session, path).await?;
        if res.is_dir() {
            return Err(DavError::invalid_operation(format!("{path} is a directory")));
        }
        if !res.permissions.read {
            return Err(DavError::forbidden(path.to_string()));
        }

        let signed = self
            .inner
            .backend
            .signed_download_url(session, &res.id)
            .await
            .map_err(|e| self.resolver().classify(e, &session.uid, path))?;
        debug!(user = %session.uid, mount = %self.name(), path = %path, id = %res.id, "streaming content");
        Ok(self.inner.blobs.get(&signed.url).await?)
    }

    async fn open_write(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<UploadSink> {
        let session = ctx.session()?;
        let filename = path
            .filename()
            .ok_or_else(|| DavError::forbidden(path.to_string()))?
            .to_string();
        validate_name(&filename)?;

        let plan = if self.resolver().load_path(session, path).await? {
            let resource = self.resolver().resolve(session, path).await?;
            if resource.is_dir() {
                return Err(DavError::invalid_operation(format!("{path} is a directory")));
            }
            if !resource.permissions.write {
                return Err(DavError::forbidden(path.to_string()));
            }
            UploadPlan::Replace { resource }
        } else {
            let (parent, parent_res) = self.creatable_parent(session, path).await?;
            let scope = self
                .resolver()
                .scope_of(session, &parent, &parent_res)
                .ok_or_else(|| DavError::forbidden(path.to_string()))?;
            UploadPlan::Create {
                parent,
                parent_res,
                scope,
                filename,
            }
        };

        Ok(UploadSink::new(
            Arc::clone(&self.inner),
            Arc::clone(session),
            path.clone(),
            plan,
        ))
    }

    async fn resource_type(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<ResourceKind> {
        let session = ctx.session()?;
        Ok(self.resolver().resolve(session, path).await?.kind)
    }

    async fn size(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<Option<u64>> {
        let session = ctx.session()?;
        Ok(self.resolver().resolve_fresh(session, path).await?.size)
    }

    async fn creation_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>> {
        let session = ctx.session()?;
        Ok(self.resolver().resolve_fresh(session, path).await?.created_at)
    }

    async fn last_modified_date(
        &self,
        ctx: &RequestContext,
        path: &VirtualPath,
    ) -> DavResult<Option<DateTime<Utc>>> {
        let session = ctx.session()?;
        Ok(self.resolver().resolve_fresh(session, path).await?.updated_at)
    }

    async fn create(&self, ctx: &RequestContext, path: &VirtualPath, kind: ResourceKind) -> DavResult<()> {
        let session = ctx.session()?;
        let name = path
            .filename()
            .ok_or_else(|| DavError::forbidden(path.to_string()))?
            .to_string();
        validate_name(&name)?;
        self.ensure_absent(session, path).await?;
        let (parent, parent_res) = self.creatable_parent(session, path).await?;
        let scope = self
            .resolver()
            .scope_of(session, &parent, &parent_res)
            .ok_or_else(|| DavError::forbidden(path.to_string()))?;

        if !kind.is_dir() && !is_office_document(&name) {
            let sink = UploadSink::new(
                Arc::clone(&self.inner),
                Arc::clone(session),
                path.clone(),
                UploadPlan::Create {
                    parent,
                    parent_res,
                    scope,
                    filename: name,
                },
            );
            sink.finish().await?;
            return Ok(());
        }

        let req = NewObject {
            name,
            owner: scope.owner,
            parent: scope.parent,
        };
        let created = if kind.is_dir() {
            self.inner.backend.create_directory(session, &req).await
        } else {
            self.inner.backend.create_document(session, &req).await
        };
        let obj = created.map_err(|e| self.resolver().classify(e, &session.uid, &parent))?;
        let resource = self.inner.adopt(session, &parent, &parent_res, obj).await;
        info!(user = %session.uid, mount = %self.name(), path = %path, id = %resource.id, ?kind, "created");
        self.cache().put(&session.uid, path, resource);
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, path: &VirtualPath) -> DavResult<()> {
        let session = ctx.session()?;
        self.require_real(path)?;
        // coarse session flag, not the per-resource delete bit
        if !session.can(FILE_DELETE) {
            return Err(DavError::forbidden(path.to_string()));
        }
        let res = self.resolver().resolve(session, path).await?;

        self.inner
            .backend
            .delete(session, &res.id, res.kind)
            .await
            .map_err(|e| self.resolver().classify(e, &session.uid, path))?;

        let removed = self.cache().delete(&session.uid, path);
        self.inner.props.forget(path);
        self.inner.locks.forget(path);
        info!(user = %session.uid, mount = %self.name(), path = %path, id = %res.id, removed, "deleted");
        Ok(())
    }

    async fn rename(&self, ctx: &RequestContext, path: &VirtualPath, new_name: &str) -> DavResult<()> {
        let session = ctx.session()?;
        validate_name(new_name)?;
        self.require_real(path)?;
        let res = self.resolver().resolve(session, path).await?;
        if !res.permissions.write {
            return Err(DavError::forbidden(path.to_string()));
        }

        let parent = path
            .parent()
            .ok_or_else(|| DavError::forbidden(path.to_string()))?;
        let target = parent.child(new_name);
        if &target == path {
            return Ok(());
        }
        self.ensure_absent(session, &target).await?;

        self.inner
            .backend
            .rename(session, &res.id, res.kind, new_name)
            .await
            .map_err(|e| self.rename_error(e, &session.uid, path))?;

        self.relocate(&session.uid, path, &target);
        info!(user = %session.uid, mount = %self.name(), from = %path, to = %target, id = %res.id, "renamed");
        Ok(())
    }

    async fn move_to(&self, ctx: &RequestContext, from: &VirtualPath, to: &VirtualPath) -> DavResult<()> {
        let session = ctx.session()?;
        let dest_parent = to
            .parent()
            .ok_or_else(|| DavError::forbidden(to.to_string()))?;
        let name = to
            .filename()
            .ok_or_else(|| DavError::forbidden(to.to_string()))?;
        if from.parent().as_ref() == Some(&dest_parent) {
            return self.rename(ctx, from, name).await;
        }

        validate_name(name)?;
        self.require_real(from)?;
        if to.starts_with(from) {
            return Err(DavError::invalid_operation(format!("cannot move {from} into itself")));
        }

        let res = self.resolver().resolve(session, from).await?;
        let dest_res = self.resolver().resolve(session, &dest_parent).await?;
        if !dest_res.is_dir() {
            return Err(DavError::invalid_operation(format!("{dest_parent} is not a directory")));
        }
        if !res.is_owned_by(&session.uid) {
            return Err(DavError::forbidden(from.to_string()));
        }
        self.ensure_absent(session, to).await?;
        let scope = self
            .resolver()
            .scope_of(session, &dest_parent, &dest_res)
            .ok_or_else(|| DavError::forbidden(to.to_string()))?;

        self.inner
            .backend
            .move_to(session, &res.id, &scope)
            .await
            .map_err(|e| self.resolver().classify(e, &session.uid, from))?;

        if from.filename() != Some(name) {
            // the move endpoint only re-parents
            self.inner
                .backend
                .rename(session, &res.id, res.kind, name)
                .await
                .map_err(|e| {
                    self.cache().delete(&session.uid, from);
                    self.rename_error(e, &session.uid, from)
                })?;
        }

        self.relocate(&session.uid, from, to);
        info!(user = %session.uid, mount = %self.name(), from = %from, to = %to, id = %res.id, "moved");
        Ok(())
    }

    fn property_manager(&self) -> &PropertyManager {
        &self.inner.props
    }

    fn lock_manager(&self) -> &LockManager {
        &self.inner.locks
    }
}
