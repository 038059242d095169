//! Backend REST client and blob store contracts.
//!
//! The filesystem core only talks to the backend through these traits. The
//! `http` module provides reqwest implementations; tests plug in fakes.

pub mod http;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::BackendError;
use crate::session::Session;
use crate::vfs::ResourceKind;

pub use http::{HttpBackend, HttpBlobStore};
pub use types::{
    AuthToken, Course, FileObject, ListScope, NewObject, PermissionEntry, RefModel,
    RegisterFile, RoleRecord, SignedUrl, Team, TeamMember, UploadTarget, UserRecord,
};

pub type BackendResult<T> = Result<T, BackendError>;

/// Streamed object content
pub type ByteStream = BoxStream<'static, BackendResult<Bytes>>;

/// Authenticated calls against the file, course and team services
#[async_trait]
pub trait Backend: Send + Sync {
    /// List the objects in the directory addressed by `scope`
    async fn list_files(&self, session: &Session, scope: &ListScope)
    -> BackendResult<Vec<FileObject>>;

    /// Fetch a single object by id
    async fn get_file(&self, session: &Session, id: &str) -> BackendResult<FileObject>;

    /// Courses the user attends, teaches or substitutes in
    async fn list_courses(&self, session: &Session) -> BackendResult<Vec<Course>>;

    /// Teams the user belongs to
    async fn list_teams(&self, session: &Session) -> BackendResult<Vec<Team>>;

    /// The user's role inside one team
    async fn team_role(&self, session: &Session, team_id: &str) -> BackendResult<Option<String>>;

    /// Objects shared with the user that the user did not create
    async fn list_shared(&self, session: &Session) -> BackendResult<Vec<FileObject>>;

    async fn create_directory(&self, session: &Session, req: &NewObject)
    -> BackendResult<FileObject>;

    /// Create an empty office document from a backend template
    async fn create_document(&self, session: &Session, req: &NewObject)
    -> BackendResult<FileObject>;

    async fn delete(&self, session: &Session, id: &str, kind: ResourceKind) -> BackendResult<()>;

    async fn rename(
        &self,
        session: &Session,
        id: &str,
        kind: ResourceKind,
        new_name: &str,
    ) -> BackendResult<()>;

    /// Re-parent an object into the directory addressed by `target`
    async fn move_to(&self, session: &Session, id: &str, target: &ListScope) -> BackendResult<()>;

    /// Short-lived download URL for an object's content
    async fn signed_download_url(&self, session: &Session, id: &str) -> BackendResult<SignedUrl>;

    /// Write-capable URL for new or replacement content
    async fn signed_upload_url(
        &self,
        session: &Session,
        target: &UploadTarget,
    ) -> BackendResult<SignedUrl>;

    /// Register an uploaded blob as a new file
    async fn register_file(&self, session: &Session, req: &RegisterFile)
    -> BackendResult<FileObject>;

    /// Record new size and modification time after content was replaced
    async fn update_size(&self, session: &Session, id: &str, size: u64)
    -> BackendResult<FileObject>;
}

/// Opaque blob storage reached through signed URLs
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, target: &SignedUrl, body: Bytes) -> BackendResult<()>;

    async fn get(&self, url: &str) -> BackendResult<ByteStream>;
}

/// Login and role-tree endpoints
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> BackendResult<AuthToken>;

    async fn current_user(&self, token: &str) -> BackendResult<UserRecord>;

    async fn role(&self, token: &str, id: &str) -> BackendResult<RoleRecord>;
}
