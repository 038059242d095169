//! Effective permission resolution.
//!
//! Merges the access-control entries the backend attaches to an object with
//! the identity and roles of a session. Every matching entry ORs its four
//! bits into the result; no matching entry means no access.

use std::collections::HashSet;

use super::resource::Permissions;
use crate::backend::{PermissionEntry, RefModel};
use crate::session::Session;

/// How role-tagged entries are matched
#[derive(Debug, Clone, Copy)]
pub enum RoleScope<'a> {
    /// Match against the session's global role set
    Global,
    /// Match against the user's role inside a team
    Team(Option<&'a str>),
}

/// Resolve the effective read/write/create/delete bits for `session`
pub fn resolve(entries: &[PermissionEntry], session: &Session, scope: RoleScope<'_>) -> Permissions {
    let mut effective = Permissions::none();
    for entry in entries {
        if matches(entry, &session.uid, &session.roles, scope) {
            effective.grant(entry.bits());
        }
    }
    effective
}

fn matches(
    entry: &PermissionEntry,
    uid: &str,
    roles: &HashSet<String>,
    scope: RoleScope<'_>,
) -> bool {
    match entry.ref_perm_model {
        RefModel::User => entry.ref_id == uid,
        RefModel::Role => match scope {
            RoleScope::Global => roles.contains(&entry.ref_id),
            RoleScope::Team(team_role) => team_role == Some(entry.ref_id.as_str()),
        },
    }
}
