use async_trait::async_trait;
use futures::future::try_join_all;

use super::RootView;
use crate::backend::{Backend, BackendResult, ListScope};
use crate::session::Session;
use crate::vfs::{Permissions, Resource, RoleScope, VirtualPath};

/// Files of the teams the user belongs to
///
/// Role-tagged entries below a team match the user's role inside that team,
/// not the global role set.
pub struct TeamsView;

impl TeamsView {
    pub fn new() -> Self {
        TeamsView
    }
}

impl Default for TeamsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RootView for TeamsView {
    fn name(&self) -> &str {
        "teams"
    }

    fn description(&self) -> &str {
        "Team files"
    }

    async fn list_top_level(
        &self,
        backend: &dyn Backend,
        session: &Session,
    ) -> BackendResult<Vec<(String, Resource)>> {
        let teams = backend.list_teams(session).await?;
        let roles = try_join_all(
            teams
                .iter()
                .map(|team| backend.team_role(session, &team.id)),
        )
        .await?;

        Ok(teams
            .into_iter()
            .zip(roles)
            .map(|(team, role)| {
                let mut entry = Resource::directory(team.id.clone());
                entry.scope_role = role.or_else(|| team.role_of(&session.uid));
                entry.pending = true;
                (team.name, entry)
            })
            .collect())
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
        let parent = (dir.depth() > 1).then(|| dir_res.id.clone());
        Some(ListScope::new(top.id.clone(), parent))
    }

    fn role_scope<'a>(&self, top: Option<&'a Resource>) -> RoleScope<'a> {
        RoleScope::Team(top.and_then(|t| t.scope_role.as_deref()))
    }

    fn descend(&self, entry: &Resource) -> Permissions {
        if entry.scope_role.is_some() {
            Permissions {
                read: true,
                create: true,
                ..Permissions::none()
            }
        } else {
            Permissions::none()
        }
    }

    fn is_virtual(&self, path: &VirtualPath) -> bool {
        path.depth() == 1
    }
}
