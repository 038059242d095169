use async_trait::async_trait;

use super::{RootView, load_listing};
use crate::backend::{Backend, BackendResult, ListScope};
use crate::session::Session;
use crate::vfs::{Permissions, Resource, RoleScope, VirtualPath};

/// The user's own files, owned by the session uid at every depth
pub struct PersonalView;

impl PersonalView {
    pub fn new() -> Self {
        PersonalView
    }
}

impl Default for PersonalView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RootView for PersonalView {
    fn name(&self) -> &str {
        "my"
    }

    fn description(&self) -> &str {
        "Personal files"
    }

    fn root_permissions(&self) -> Permissions {
        Permissions::all()
    }

    async fn list_top_level(
        &self,
        backend: &dyn Backend,
        session: &Session,
    ) -> BackendResult<Vec<(String, Resource)>> {
        let scope = ListScope::new(session.uid.clone(), None);
        load_listing(backend, session, &scope, RoleScope::Global).await
    }

    fn listing_scope(
        &self,
        session: &Session,
        dir: &VirtualPath,
        dir_res: &Resource,
        _top: Option<&Resource>,
    ) -> Option<ListScope> {
        let parent = (!dir.is_root()).then(|| dir_res.id.clone());
        Some(ListScope::new(session.uid.clone(), parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_always_session_uid() {
        let view = PersonalView::new();
        let session = Session::new("u1", "ada", "t");

        let root = view
            .listing_scope(&session, &VirtualPath::root(), &Resource::directory("u1"), None)
            .unwrap();
        assert_eq!(root, ListScope::new("u1", None));

        let top = Resource::directory("d1");
        let nested = view
            .listing_scope(
                &session,
                &VirtualPath::parse("/docs/2024"),
                &Resource::directory("d2"),
                Some(&top),
            )
            .unwrap();
        assert_eq!(nested, ListScope::new("u1", Some("d2".into())));
    }
}
