use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::backend::{AuthBackend, BackendResult};

/// Flattened result of walking the nested role graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTree {
    /// Ids of every role reached
    pub roles: HashSet<String>,
    /// Union of the permission flags those roles grant
    pub permissions: HashSet<String>,
}

/// Walk the role graph starting from the user's direct role assignments
///
/// The backend does not guarantee the graph is acyclic, so every role id is
/// fetched at most once.
pub async fn load_role_tree(
    auth: &dyn AuthBackend,
    token: &str,
    direct: &[String],
) -> BackendResult<RoleTree> {
    let mut tree = RoleTree::default();
    let mut queue: VecDeque<String> = direct.iter().cloned().collect();

    while let Some(id) = queue.pop_front() {
        if !tree.roles.insert(id.clone()) {
            continue;
        }
        let role = auth.role(token, &id).await?;
        debug!(role = %id, name = %role.name, nested = role.roles.len(), "loaded role");
        tree.permissions.extend(role.permissions);
        queue.extend(
            role.roles
                .into_iter()
                .filter(|nested| !tree.roles.contains(nested)),
        );
    }

    Ok(tree)
}
