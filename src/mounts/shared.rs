use async_trait::async_trait;

use super::{RootView, hydrate};
use crate::backend::{Backend, BackendResult, ListScope};
use crate::session::Session;
use crate::vfs::{Resource, RoleScope, VirtualPath};

/// Objects other users shared with the session user
///
/// There is no parent directory to descend from, so top-level entries are
/// hydrated with full permissions when listed.
pub struct SharedView;

impl SharedView {
    pub fn new() -> Self {
        SharedView
    }
}

impl Default for SharedView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RootView for SharedView {
    fn name(&self) -> &str {
        "shared"
    }

    fn description(&self) -> &str {
        "Files shared with me"
    }

    async fn list_top_level(
        &self,
        backend: &dyn Backend,
        session: &Session,
    ) -> BackendResult<Vec<(String, Resource)>> {
        let objects = backend.list_shared(session).await?;
        Ok(hydrate(objects, session, RoleScope::Global))
    }

    fn listing_scope(
        &self,
        _session: &Session,
        dir: &VirtualPath,
        dir_res: &Resource,
        top: Option<&Resource>,
    ) -> Option<ListScope> {
        if dir.is_root() {
            return None;
        }
        let top = top?;
        Some(ListScope::new(top.id.clone(), Some(dir_res.id.clone())))
    }
}
