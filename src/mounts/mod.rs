pub mod courses;
pub mod personal;
pub mod shared;
pub mod teams;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Backend, BackendResult, FileObject, ListScope};
use crate::session::Session;
use crate::vfs::{Permissions, Resource, RoleScope, VirtualPath, resolve};

pub use courses::CoursesView;
pub use personal::PersonalView;
pub use shared::SharedView;
pub use teams::TeamsView;

/// Per-mount strategy for the top level and for backend addressing
///
/// A mount's top level comes from a different backend collection for every
/// view, and so does the owner id used to address directories below it.
#[async_trait]
pub trait RootView: Send + Sync {
    /// Mount name (first segment of a full path)
    fn name(&self) -> &str;

    /// Human readable description
    fn description(&self) -> &str;

    /// Permissions on the mount root itself
    fn root_permissions(&self) -> Permissions {
        Permissions::read_only()
    }

    /// Entries shown directly under the mount root
    async fn list_top_level(
        &self,
        backend: &dyn Backend,
        session: &Session,
    ) -> BackendResult<Vec<(String, Resource)>>;

    /// Owner/parent pair addressing `dir` in listing and creation requests
    ///
    /// `top` is the cached top-level ancestor of `dir` (absent for the root).
    fn listing_scope(
        &self,
        session: &Session,
        dir: &VirtualPath,
        dir_res: &Resource,
        top: Option<&Resource>,
    ) -> Option<ListScope>;

    /// How role-tagged permission entries below `top` are matched
    fn role_scope<'a>(&self, _top: Option<&'a Resource>) -> RoleScope<'a> {
        RoleScope::Global
    }

    /// Permissions for a pending top-level entry, resolved on first descent
    fn descend(&self, entry: &Resource) -> Permissions {
        entry.permissions
    }

    /// Whether `path` is a synthesized entry with no backend file behind it
    fn is_virtual(&self, _path: &VirtualPath) -> bool {
        false
    }
}

/// Convert backend objects into cache entries, resolving permissions
pub fn hydrate(
    objects: Vec<FileObject>,
    session: &Session,
    scope: RoleScope<'_>,
) -> Vec<(String, Resource)> {
    objects
        .into_iter()
        .map(|obj| {
            let permissions = resolve(&obj.permissions, session, scope);
            (obj.name.clone(), obj.into_resource(permissions))
        })
        .collect()
}

/// Generic directory loader: list the directory addressed by `scope`
pub async fn load_listing(
    backend: &dyn Backend,
    session: &Session,
    scope: &ListScope,
    role_scope: RoleScope<'_>,
) -> BackendResult<Vec<(String, Resource)>> {
    let objects = backend.list_files(session, scope).await?;
    Ok(hydrate(objects, session, role_scope))
}

/// Registry of available root views
pub struct ViewRegistry {
    views: HashMap<String, Arc<dyn RootView>>,
}

impl ViewRegistry {
    /// Create a new registry with all built-in views
    pub fn new() -> Self {
        let mut registry = Self {
            views: HashMap::new(),
        };

        registry.register(Arc::new(PersonalView::new()));
        registry.register(Arc::new(CoursesView::new()));
        registry.register(Arc::new(TeamsView::new()));
        registry.register(Arc::new(SharedView::new()));

        registry
    }

    /// Register a view
    pub fn register(&mut self, view: Arc<dyn RootView>) {
        self.views.insert(view.name().to_string(), view);
    }

    /// Get a view by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn RootView>> {
        self.views.get(name).cloned()
    }

    /// List all available view names
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.views.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_views() {
        let registry = ViewRegistry::new();
        assert_eq!(registry.list(), vec!["courses", "my", "shared", "teams"]);
        assert!(registry.get("courses").is_some());
        assert!(registry.get("nope").is_none());
    }
}
