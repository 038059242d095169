use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::types::*;
use super::{AuthBackend, Backend, BackendResult, BlobStore, ByteStream};
use crate::error::BackendError;
use crate::session::Session;
use crate::vfs::ResourceKind;

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
}

/// Feathers-style list responses are either paginated or plain arrays
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Paged { data: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Page<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Page::Paged { data } => data,
            Page::Plain(items) => items,
        }
    }
}

/// Wrapper around the backend REST API
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        debug!(method = method.as_str(), path, "backend request");
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> BackendResult<T> {
        let resp = check(req.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| BackendError::decode(e.to_string()))
    }

    async fn send_empty(req: RequestBuilder) -> BackendResult<()> {
        check(req.send().await?).await?;
        Ok(())
    }

    async fn list_page<T: DeserializeOwned>(req: RequestBuilder) -> BackendResult<Vec<T>> {
        Self::send::<Page<T>>(req).await.map(Page::into_vec)
    }
}

/// Turn a non-success response into a status error carrying `{code, message}`
async fn check(resp: Response) -> BackendResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => (
            match err.code {
                serde_json::Value::Null => status.as_u16().to_string(),
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
            err.message.unwrap_or_else(|| status.to_string()),
        ),
        Err(_) => (status.as_u16().to_string(), body),
    };
    Err(BackendError::Status {
        status: status.as_u16(),
        code,
        message,
    })
}

fn storage_path(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Directory => "fileStorage/directories",
        ResourceKind::File => "fileStorage",
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_files(
        &self,
        session: &Session,
        scope: &ListScope,
    ) -> BackendResult<Vec<FileObject>> {
        let mut query = vec![("owner", scope.owner.as_str())];
        if let Some(parent) = &scope.parent {
            query.push(("parent", parent.as_str()));
        }
        let req = self
            .request(Method::GET, "fileStorage", &session.token)
            .query(&query);
        Self::list_page(req).await
    }

    async fn get_file(&self, session: &Session, id: &str) -> BackendResult<FileObject> {
        let req = self.request(Method::GET, &format!("files/{id}"), &session.token);
        Self::send(req).await
    }

    async fn list_courses(&self, session: &Session) -> BackendResult<Vec<Course>> {
        let uid = session.uid.as_str();
        let req = self
            .request(Method::GET, "courses", &session.token)
            .query(&[
                ("$or[0][userIds]", uid),
                ("$or[1][teacherIds]", uid),
                ("$or[2][substitutionIds]", uid),
            ]);
        Self::list_page(req).await
    }

    async fn list_teams(&self, session: &Session) -> BackendResult<Vec<Team>> {
        let req = self
            .request(Method::GET, "teams", &session.token)
            .query(&[("userIds.userId", session.uid.as_str())]);
        Self::list_page(req).await
    }

    async fn team_role(&self, session: &Session, team_id: &str) -> BackendResult<Option<String>> {
        let req = self.request(Method::GET, &format!("teams/{team_id}"), &session.token);
        let team: Team = Self::send(req).await?;
        Ok(team.role_of(&session.uid))
    }

    async fn list_shared(&self, session: &Session) -> BackendResult<Vec<FileObject>> {
        let uid = session.uid.as_str();
        let req = self
            .request(Method::GET, "files", &session.token)
            .query(&[("permissions.refId", uid), ("creator[$ne]", uid)]);
        Self::list_page(req).await
    }

    async fn create_directory(
        &self,
        session: &Session,
        req: &NewObject,
    ) -> BackendResult<FileObject> {
        let http = self
            .request(Method::POST, "fileStorage/directories", &session.token)
            .json(req);
        Self::send(http).await
    }

    async fn create_document(
        &self,
        session: &Session,
        req: &NewObject,
    ) -> BackendResult<FileObject> {
        let http = self
            .request(Method::POST, "fileStorage/files/new", &session.token)
            .json(req);
        Self::send(http).await
    }

    async fn delete(&self, session: &Session, id: &str, kind: ResourceKind) -> BackendResult<()> {
        let req = self
            .request(Method::DELETE, storage_path(kind), &session.token)
            .query(&[("_id", id)]);
        Self::send_empty(req).await
    }

    async fn rename(
        &self,
        session: &Session,
        id: &str,
        kind: ResourceKind,
        new_name: &str,
    ) -> BackendResult<()> {
        let path = format!("{}/rename", storage_path(kind));
        let req = self
            .request(Method::POST, &path, &session.token)
            .json(&json!({ "_id": id, "newName": new_name }));
        Self::send_empty(req).await
    }

    async fn move_to(&self, session: &Session, id: &str, target: &ListScope) -> BackendResult<()> {
        let req = self
            .request(Method::PATCH, &format!("fileStorage/{id}"), &session.token)
            .json(&json!({ "parent": target.parent, "owner": target.owner }));
        Self::send_empty(req).await
    }

    async fn signed_download_url(&self, session: &Session, id: &str) -> BackendResult<SignedUrl> {
        let req = self
            .request(Method::GET, "fileStorage/signedUrl", &session.token)
            .query(&[("file", id), ("download", "true")]);
        Self::send(req).await
    }

    async fn signed_upload_url(
        &self,
        session: &Session,
        target: &UploadTarget,
    ) -> BackendResult<SignedUrl> {
        let req = match target {
            UploadTarget::Existing { id } => self.request(
                Method::PATCH,
                &format!("fileStorage/signedUrl/{id}"),
                &session.token,
            ),
            UploadTarget::New {
                scope,
                filename,
                mime,
            } => self
                .request(Method::POST, "fileStorage/signedUrl", &session.token)
                .json(&json!({
                    "owner": scope.owner,
                    "parent": scope.parent,
                    "filename": filename,
                    "fileType": mime,
                })),
        };
        Self::send(req).await
    }

    async fn register_file(
        &self,
        session: &Session,
        req: &RegisterFile,
    ) -> BackendResult<FileObject> {
        let http = self
            .request(Method::POST, "fileStorage", &session.token)
            .json(req);
        Self::send(http).await
    }

    async fn update_size(
        &self,
        session: &Session,
        id: &str,
        size: u64,
    ) -> BackendResult<FileObject> {
        let req = self
            .request(Method::PATCH, &format!("files/{id}"), &session.token)
            .json(&json!({ "size": size, "updatedAt": chrono::Utc::now() }));
        Self::send(req).await
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn authenticate(&self, username: &str, password: &str) -> BackendResult<AuthToken> {
        let req = self.client.post(self.url("authentication")).json(&json!({
            "strategy": "local",
            "username": username,
            "password": password,
        }));
        Self::send(req).await
    }

    async fn current_user(&self, token: &str) -> BackendResult<UserRecord> {
        Self::send(self.request(Method::GET, "me", token)).await
    }

    async fn role(&self, token: &str, id: &str) -> BackendResult<RoleRecord> {
        Self::send(self.request(Method::GET, &format!("roles/{id}"), token)).await
    }
}

/// Blob store reached through pre-signed URLs (no backend credentials)
pub struct HttpBlobStore {
    client: Client,
}

impl HttpBlobStore {
    pub fn new(timeout: Duration) -> BackendResult<Self> {
        Ok(HttpBlobStore {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, target: &SignedUrl, body: Bytes) -> BackendResult<()> {
        let mut req = self.client.put(&target.url).body(body);
        for (name, value) in &target.header {
            req = req.header(name.as_str(), value.as_str());
        }
        check(req.send().await?).await?;
        Ok(())
    }

    async fn get(&self, url: &str) -> BackendResult<ByteStream> {
        let resp = check(self.client.get(url).send().await?).await?;
        Ok(resp.bytes_stream().map_err(BackendError::from).boxed())
    }
}
