use std::sync::Arc;
use tracing::{info, warn};

use super::{Session, SessionCache, load_role_tree};
use crate::backend::AuthBackend;
use crate::error::{DavError, DavResult};

/// Turns credentials into sessions and remembers them by username
pub struct SessionProvider {
    auth: Arc<dyn AuthBackend>,
    cache: SessionCache,
}

impl SessionProvider {
    pub fn new(auth: Arc<dyn AuthBackend>, capacity: usize) -> Self {
        SessionProvider {
            auth,
            cache: SessionCache::new(capacity),
        }
    }

    /// Authenticate and build a session with its full role tree
    ///
    /// Rejected credentials surface as `BadAuthentication`.
    pub async fn login(&self, username: &str, password: &str) -> DavResult<Arc<Session>> {
        let token = self
            .auth
            .authenticate(username, password)
            .await
            .map_err(|e| {
                warn!(user = username, error = %e, "authentication failed");
                if e.is_forbidden() {
                    DavError::BadAuthentication
                } else {
                    DavError::Backend(e)
                }
            })?;

        let user = self.auth.current_user(&token.access_token).await?;
        let tree = load_role_tree(self.auth.as_ref(), &token.access_token, &user.roles).await?;

        let session = Session::new(user.id, username, token.access_token)
            .with_display_name(user.display_name.unwrap_or_else(|| username.to_string()))
            .with_roles(tree.roles)
            .with_permissions(tree.permissions);
        info!(
            user = %session.uid,
            roles = session.roles.len(),
            permissions = session.permissions.len(),
            "session established"
        );

        let session = Arc::new(session);
        self.cache.put(username.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// A previously established session for `username`
    pub fn by_name(&self, username: &str) -> Option<Arc<Session>> {
        self.cache.get(username)
    }

    /// Drop the cached session for `username`
    pub fn logout(&self, username: &str) -> bool {
        self.cache.remove(username).is_some()
    }
}
