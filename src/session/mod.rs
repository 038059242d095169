//! Authenticated sessions.
//!
//! A [`Session`] is what the filesystem core consumes: identity, bearer
//! credential, the resolved role set and the coarse permission flags.

pub mod cache;
pub mod provider;
pub mod roles;

use std::collections::HashSet;
use std::fmt;

pub use cache::SessionCache;
pub use provider::SessionProvider;
pub use roles::{RoleTree, load_role_tree};

/// Coarse flag allowing the user to delete files and directories
pub const FILE_DELETE: &str = "FILE_DELETE";

#[derive(Clone)]
pub struct Session {
    pub uid: String,
    pub username: String,
    pub display_name: String,
    /// Bearer credential sent with every backend request
    pub token: String,
    /// Every role id reachable from the user's direct role assignments
    pub roles: HashSet<String>,
    /// Permission flags granted by those roles
    pub permissions: HashSet<String>,
}

impl Session {
    pub fn new(uid: impl Into<String>, username: impl Into<String>, token: impl Into<String>) -> Self {
        let username = username.into();
        Session {
            uid: uid.into(),
            display_name: username.clone(),
            username,
            token: token.into(),
            roles: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Check a coarse permission flag
    pub fn can(&self, flag: &str) -> bool {
        self.permissions.contains(flag)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("username", &self.username)
            .field("roles", &self.roles.len())
            .field("permissions", &self.permissions.len())
            .finish_non_exhaustive()
    }
}
