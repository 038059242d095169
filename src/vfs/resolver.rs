use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{Permissions, Resource, ResourceCache, VirtualPath, resolve};
use crate::backend::{Backend, FileObject, ListScope, PermissionEntry};
use crate::error::{BackendError, DavError, DavResult};
use crate::mounts::{RootView, load_listing};
use crate::session::Session;

/// Resolves mount-relative paths to cached resources
///
/// Paths are materialized on demand: a lookup walks up to the nearest cached
/// ancestor and then lists one directory per missing segment on the way back
/// down. Every listing caches all of its children.
pub struct PathResolver {
    view: Arc<dyn RootView>,
    backend: Arc<dyn Backend>,
    cache: ResourceCache,
    metadata_ttl: Duration,
}

impl PathResolver {
    pub fn new(
        view: Arc<dyn RootView>,
        backend: Arc<dyn Backend>,
        cache: ResourceCache,
        metadata_ttl: Duration,
    ) -> Self {
        PathResolver {
            view,
            backend,
            cache,
            metadata_ttl,
        }
    }

    pub fn view(&self) -> &dyn RootView {
        self.view.as_ref()
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Cache (if needed) and return the mount root for `session`
    pub fn ensure_root(&self, session: &Session) -> Resource {
        let root = VirtualPath::root();
        if let Some(resource) = self.cache.get(&session.uid, &root) {
            return resource;
        }
        let mut resource = Resource::directory(session.uid.clone());
        resource.permissions = self.view.root_permissions();
        self.cache.put(&session.uid, &root, resource.clone());
        resource
    }

    /// Cached entry at `path`, resolving the permissions of a pending
    /// top-level entry on first access
    pub fn entry(&self, session: &Session, path: &VirtualPath) -> Option<Resource> {
        let resource = self.cache.get(&session.uid, path)?;
        if !resource.pending {
            return Some(resource);
        }
        let permissions = self.view.descend(&resource);
        debug!(
            user = %session.uid,
            mount = self.view.name(),
            path = %path,
            ?permissions,
            "resolved top-level permissions"
        );
        self.cache.update(&session.uid, path, |res| {
            res.permissions = permissions;
            res.pending = false;
        });
        Some(Resource {
            permissions,
            pending: false,
            ..resource
        })
    }

    /// List `dir` from the backend and replace its cached children
    ///
    /// `dir` must already be cached (the root always can be).
    pub async fn load_directory(
        &self,
        session: &Session,
        dir: &VirtualPath,
    ) -> DavResult<Vec<(String, Resource)>> {
        let uid = session.uid.as_str();
        let listing = if dir.is_root() {
            self.ensure_root(session);
            self.view
                .list_top_level(self.backend.as_ref(), session)
                .await
                .map_err(|e| self.classify(e, uid, dir))?
        } else {
            let dir_res = self
                .entry(session, dir)
                .ok_or_else(|| DavError::not_found(dir.to_string()))?;
            let top = dir.top_level().and_then(|t| self.entry(session, &t));
            let scope = self
                .view
                .listing_scope(session, dir, &dir_res, top.as_ref())
                .ok_or_else(|| DavError::not_found(dir.to_string()))?;
            load_listing(
                self.backend.as_ref(),
                session,
                &scope,
                self.view.role_scope(top.as_ref()),
            )
            .await
            .map_err(|e| self.classify(e, uid, dir))?
        };

        debug!(
            user = %uid,
            mount = self.view.name(),
            path = %dir,
            entries = listing.len(),
            "listed directory"
        );

        if !self.cache.replace_children(uid, dir, listing.clone()) {
            // invalidated while the listing was in flight
            return Err(DavError::not_found(dir.to_string()));
        }
        Ok(listing)
    }

    /// Make sure `path` and all of its ancestors are cached
    ///
    /// Returns `Ok(false)` when some segment does not exist. Already cached
    /// paths return immediately without touching the backend.
    pub async fn load_path(&self, session: &Session, path: &VirtualPath) -> DavResult<bool> {
        let uid = session.uid.as_str();
        if self.cache.contains(uid, path) {
            return Ok(true);
        }
        self.ensure_root(session);
        if path.is_root() {
            return Ok(true);
        }

        let mut depth = path.depth() - 1;
        while depth > 0 && !self.cache.contains(uid, &path.truncate(depth)) {
            depth -= 1;
        }

        for level in depth..path.depth() {
            let dir = path.truncate(level);
            match self.cache.get(uid, &dir) {
                Some(res) if res.is_dir() => {}
                _ => return Ok(false),
            }
            let listing = match self.load_directory(session, &dir).await {
                Ok(listing) => listing,
                Err(DavError::ResourceNotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            };
            let next = &path.segments()[level];
            if !listing.iter().any(|(name, _)| name == next) {
                return Ok(false);
            }
        }

        Ok(self.cache.contains(uid, path))
    }

    /// Resolve `path` to its resource or fail with `ResourceNotFound`
    pub async fn resolve(&self, session: &Session, path: &VirtualPath) -> DavResult<Resource> {
        if !self.load_path(session, path).await? {
            return Err(DavError::not_found(path.to_string()));
        }
        self.entry(session, path)
            .ok_or_else(|| DavError::not_found(path.to_string()))
    }

    /// Like [`resolve`](Self::resolve), but re-lists the parent first when
    /// the cached metadata is older than the configured TTL
    pub async fn resolve_fresh(&self, session: &Session, path: &VirtualPath) -> DavResult<Resource> {
        let resource = self.resolve(session, path).await?;
        if !resource.is_stale(self.metadata_ttl) {
            return Ok(resource);
        }
        let Some(parent) = path.parent() else {
            return Ok(resource);
        };
        debug!(user = %session.uid, mount = self.view.name(), path = %path, "refreshing stale metadata");
        self.load_directory(session, &parent).await?;
        self.entry(session, path)
            .ok_or_else(|| DavError::not_found(path.to_string()))
    }

    /// Owner/parent pair addressing the directory `dir`
    pub fn scope_of(&self, session: &Session, dir: &VirtualPath, dir_res: &Resource) -> Option<ListScope> {
        let top = dir.top_level().and_then(|t| self.entry(session, &t));
        self.view.listing_scope(session, dir, dir_res, top.as_ref())
    }

    /// Effective permissions of an object living below `dir`
    pub fn permissions_below(
        &self,
        session: &Session,
        dir: &VirtualPath,
        entries: &[PermissionEntry],
    ) -> Permissions {
        let top = dir.top_level().and_then(|t| self.entry(session, &t));
        resolve(entries, session, self.view.role_scope(top.as_ref()))
    }

    /// Convert a backend object created under `dir` into a cache entry
    pub fn hydrate_below(&self, session: &Session, dir: &VirtualPath, obj: FileObject) -> Resource {
        let permissions = self.permissions_below(session, dir, &obj.permissions);
        obj.into_resource(permissions)
    }

    /// Map a backend failure on `path` to the protocol taxonomy
    ///
    /// Not-found errors evict the cached entry and its subtree.
    pub fn classify(&self, err: BackendError, user: &str, path: &VirtualPath) -> DavError {
        if err.is_not_found() {
            let removed = self.invalidate(user, path);
            info!(
                user,
                mount = self.view.name(),
                path = %path,
                removed,
                "backend reported object missing, invalidated cache"
            );
            DavError::not_found(path.to_string())
        } else if err.is_forbidden() {
            DavError::forbidden(path.to_string())
        } else {
            DavError::Backend(err)
        }
    }

    /// Drop `path` (and its cached subtree) for `user`
    pub fn invalidate(&self, user: &str, path: &VirtualPath) -> usize {
        self.cache.delete(user, path)
    }
}
