//! In-memory backend, blob store and auth service for integration tests.
//!
//! Every call is recorded so tests can assert how many backend round trips
//! an operation needed. Failures can be injected per operation.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use edudav::backend::types::STORAGE_NAME_HEADER;
use edudav::backend::{
    AuthBackend, AuthToken, Backend, BackendResult, BlobStore, ByteStream, Course, FileObject,
    ListScope, NewObject, PermissionEntry, RefModel, RegisterFile, RoleRecord, SignedUrl, Team,
    TeamMember, UploadTarget, UserRecord,
};
use edudav::error::BackendError;
use edudav::fs::{MountFs, MountTable, RequestContext};
use edudav::mounts::RootView;
use edudav::session::{FILE_DELETE, Session};
use edudav::vfs::ResourceKind;

pub const RWCD: [bool; 4] = [true, true, true, true];
pub const R: [bool; 4] = [true, false, false, false];
pub const RW: [bool; 4] = [true, true, false, false];

pub fn user_perm(uid: &str, bits: [bool; 4]) -> PermissionEntry {
    PermissionEntry {
        ref_id: uid.to_string(),
        ref_perm_model: RefModel::User,
        read: bits[0],
        write: bits[1],
        create: bits[2],
        delete: bits[3],
    }
}

pub fn role_perm(role: &str, bits: [bool; 4]) -> PermissionEntry {
    PermissionEntry {
        ref_perm_model: RefModel::Role,
        ..user_perm(role, bits)
    }
}

#[derive(Default)]
struct State {
    files: HashMap<String, FileObject>,
    courses: Vec<Course>,
    teams: Vec<Team>,
    shared: Vec<String>,
    blobs: HashMap<String, Bytes>,
    failures: HashMap<String, u16>,
    blob_put_fails: bool,
    bare_creates: bool,
    next_id: u64,
    users: HashMap<String, (String, UserRecord)>,
    roles: HashMap<String, RoleRecord>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub fn add_course(&self, id: &str, name: &str, teachers: &[&str], students: &[&str]) {
        self.state.lock().unwrap().courses.push(Course {
            id: id.into(),
            name: name.into(),
            user_ids: students.iter().map(|s| s.to_string()).collect(),
            teacher_ids: teachers.iter().map(|s| s.to_string()).collect(),
            substitution_ids: Vec::new(),
        });
    }

    pub fn add_team(&self, id: &str, name: &str, members: &[(&str, &str)]) {
        self.state.lock().unwrap().teams.push(Team {
            id: id.into(),
            name: name.into(),
            user_ids: members
                .iter()
                .map(|(uid, role)| TeamMember {
                    user_id: uid.to_string(),
                    role: Some(role.to_string()),
                })
                .collect(),
        });
    }

    pub fn add_dir(
        &self,
        id: &str,
        name: &str,
        owner: &str,
        parent: Option<&str>,
        permissions: Vec<PermissionEntry>,
    ) {
        self.insert(object(id, name, true, owner, parent, permissions, None));
    }

    pub fn add_file(
        &self,
        id: &str,
        name: &str,
        owner: &str,
        parent: Option<&str>,
        permissions: Vec<PermissionEntry>,
        content: &[u8],
    ) {
        self.insert(object(
            id,
            name,
            false,
            owner,
            parent,
            permissions,
            Some(content.len() as i64),
        ));
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(blob_url(id), Bytes::copy_from_slice(content));
    }

    /// Share an existing object with everyone (it shows up under `shared`)
    pub fn share(&self, id: &str, creator: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(obj) = state.files.get_mut(id) {
            obj.creator = Some(creator.to_string());
        }
        state.shared.push(id.to_string());
    }

    pub fn add_user(&self, username: &str, password: &str, uid: &str, roles: &[&str]) {
        self.state.lock().unwrap().users.insert(
            username.to_string(),
            (
                password.to_string(),
                UserRecord {
                    id: uid.to_string(),
                    display_name: Some(format!("{username} (display)")),
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                },
            ),
        );
    }

    pub fn add_role(&self, id: &str, nested: &[&str], permissions: &[&str]) {
        self.state.lock().unwrap().roles.insert(
            id.to_string(),
            RoleRecord {
                id: id.to_string(),
                name: id.to_string(),
                roles: nested.iter().map(|r| r.to_string()).collect(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            },
        );
    }

    fn insert(&self, obj: FileObject) {
        self.state.lock().unwrap().files.insert(obj.id.clone(), obj);
    }

    // ------------------------------------------------------------------
    // Inspection and fault injection
    // ------------------------------------------------------------------

    /// Make the next call to `op` fail with `status`
    pub fn fail_next(&self, op: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), status);
    }

    /// Make every blob store PUT fail
    pub fn reject_blob_puts(&self) {
        self.state.lock().unwrap().blob_put_fails = true;
    }

    /// Return created objects without permission entries
    pub fn bare_creates(&self) {
        self.state.lock().unwrap().bare_creates = true;
    }

    pub fn object(&self, id: &str) -> Option<FileObject> {
        self.state.lock().unwrap().files.get(id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<FileObject> {
        self.state
            .lock()
            .unwrap()
            .files
            .values()
            .find(|f| f.name == name)
            .cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, op: &str, detail: impl AsRef<str>) -> BackendResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{op} {}", detail.as_ref()));
        match self.state.lock().unwrap().failures.remove(op) {
            Some(status) => Err(BackendError::status(status, format!("injected {op} failure"))),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{prefix}{}", state.next_id)
    }

    fn created(&self, session: &Session, req: &NewObject, dir: bool) -> FileObject {
        let id = self.next_id(if dir { "dir" } else { "doc" });
        let permissions = if self.state.lock().unwrap().bare_creates {
            Vec::new()
        } else {
            vec![user_perm(&session.uid, RWCD)]
        };
        let mut obj = object(
            &id,
            &req.name,
            dir,
            &req.owner,
            req.parent.as_deref(),
            permissions,
            if dir { None } else { Some(0) },
        );
        obj.creator = Some(session.uid.clone());
        self.insert(obj.clone());
        obj
    }

    fn not_found(id: &str) -> BackendError {
        BackendError::status(404, format!("no object {id}"))
    }
}

fn object(
    id: &str,
    name: &str,
    dir: bool,
    owner: &str,
    parent: Option<&str>,
    permissions: Vec<PermissionEntry>,
    size: Option<i64>,
) -> FileObject {
    FileObject {
        id: id.to_string(),
        name: name.to_string(),
        is_directory: dir,
        size,
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
        permissions,
        owner: Some(owner.to_string()),
        creator: None,
        parent: parent.map(str::to_string),
    }
}

fn blob_url(id: &str) -> String {
    format!("mem://blob/{id}")
}

fn upload_url(storage: &str) -> String {
    format!("mem://upload/{storage}")
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_files(&self, _session: &Session, scope: &ListScope) -> BackendResult<Vec<FileObject>> {
        tokio::task::yield_now().await;
        self.record("list_files", format!("{}:{:?}", scope.owner, scope.parent))?;
        let state = self.state.lock().unwrap();
        let mut items: Vec<FileObject> = state
            .files
            .values()
            .filter(|f| f.owner.as_deref() == Some(scope.owner.as_str()) && f.parent == scope.parent)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_file(&self, _session: &Session, id: &str) -> BackendResult<FileObject> {
        self.record("get_file", id)?;
        self.object(id).ok_or_else(|| Self::not_found(id))
    }

    async fn list_courses(&self, session: &Session) -> BackendResult<Vec<Course>> {
        tokio::task::yield_now().await;
        self.record("list_courses", &session.uid)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .courses
            .iter()
            .filter(|c| c.role_of(&session.uid).is_some())
            .cloned()
            .collect())
    }

    async fn list_teams(&self, session: &Session) -> BackendResult<Vec<Team>> {
        tokio::task::yield_now().await;
        self.record("list_teams", &session.uid)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .teams
            .iter()
            .filter(|t| t.user_ids.iter().any(|m| m.user_id == session.uid))
            .cloned()
            .collect())
    }

    async fn team_role(&self, session: &Session, team_id: &str) -> BackendResult<Option<String>> {
        self.record("team_role", team_id)?;
        let state = self.state.lock().unwrap();
        let team = state
            .teams
            .iter()
            .find(|t| t.id == team_id)
            .ok_or_else(|| Self::not_found(team_id))?;
        Ok(team.role_of(&session.uid))
    }

    async fn list_shared(&self, session: &Session) -> BackendResult<Vec<FileObject>> {
        self.record("list_shared", &session.uid)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .shared
            .iter()
            .filter_map(|id| state.files.get(id))
            .filter(|f| f.creator.as_deref() != Some(session.uid.as_str()))
            .filter(|f| f.permissions.iter().any(|p| p.ref_id == session.uid))
            .cloned()
            .collect())
    }

    async fn create_directory(&self, session: &Session, req: &NewObject) -> BackendResult<FileObject> {
        self.record("create_directory", &req.name)?;
        Ok(self.created(session, req, true))
    }

    async fn create_document(&self, session: &Session, req: &NewObject) -> BackendResult<FileObject> {
        self.record("create_document", &req.name)?;
        let obj = self.created(session, req, false);
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(blob_url(&obj.id), Bytes::new());
        Ok(obj)
    }

    async fn delete(&self, _session: &Session, id: &str, _kind: ResourceKind) -> BackendResult<()> {
        self.record("delete", id)?;
        let mut state = self.state.lock().unwrap();
        state.files.remove(id).ok_or_else(|| Self::not_found(id))?;
        state.files.retain(|_, f| f.parent.as_deref() != Some(id));
        Ok(())
    }

    async fn rename(
        &self,
        _session: &Session,
        id: &str,
        _kind: ResourceKind,
        new_name: &str,
    ) -> BackendResult<()> {
        self.record("rename", format!("{id}:{new_name}"))?;
        let mut state = self.state.lock().unwrap();
        let obj = state.files.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        obj.name = new_name.to_string();
        Ok(())
    }

    async fn move_to(&self, _session: &Session, id: &str, target: &ListScope) -> BackendResult<()> {
        self.record("move_to", format!("{id}:{}:{:?}", target.owner, target.parent))?;
        let mut state = self.state.lock().unwrap();
        let obj = state.files.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        obj.owner = Some(target.owner.clone());
        obj.parent = target.parent.clone();
        Ok(())
    }

    async fn signed_download_url(&self, _session: &Session, id: &str) -> BackendResult<SignedUrl> {
        self.record("signed_download_url", id)?;
        if self.object(id).is_none() {
            return Err(Self::not_found(id));
        }
        Ok(SignedUrl {
            url: blob_url(id),
            header: HashMap::new(),
        })
    }

    async fn signed_upload_url(
        &self,
        _session: &Session,
        target: &UploadTarget,
    ) -> BackendResult<SignedUrl> {
        match target {
            UploadTarget::Existing { id } => {
                self.record("signed_upload_url", id)?;
                if self.object(id).is_none() {
                    return Err(Self::not_found(id));
                }
                Ok(SignedUrl {
                    url: blob_url(id),
                    header: HashMap::new(),
                })
            }
            UploadTarget::New { filename, mime, .. } => {
                self.record("signed_upload_url", format!("new:{filename}:{mime}"))?;
                let storage = self.next_id(&format!("flat-{filename}-"));
                Ok(SignedUrl {
                    url: upload_url(&storage),
                    header: HashMap::from([(STORAGE_NAME_HEADER.to_string(), storage)]),
                })
            }
        }
    }

    async fn register_file(&self, session: &Session, req: &RegisterFile) -> BackendResult<FileObject> {
        self.record("register_file", &req.storage_file_name)?;
        let id = self.next_id("file");
        let permissions = if self.state.lock().unwrap().bare_creates {
            Vec::new()
        } else {
            vec![user_perm(&session.uid, RWCD)]
        };
        let mut obj = object(
            &id,
            &req.name,
            false,
            &req.owner,
            req.parent.as_deref(),
            permissions,
            Some(req.size as i64),
        );
        obj.creator = Some(session.uid.clone());
        let mut state = self.state.lock().unwrap();
        let content = state
            .blobs
            .remove(&upload_url(&req.storage_file_name))
            .unwrap_or_default();
        state.blobs.insert(blob_url(&id), content);
        state.files.insert(id, obj.clone());
        Ok(obj)
    }

    async fn update_size(&self, _session: &Session, id: &str, size: u64) -> BackendResult<FileObject> {
        self.record("update_size", format!("{id}:{size}"))?;
        let mut state = self.state.lock().unwrap();
        let obj = state.files.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        obj.size = Some(size as i64);
        obj.updated_at = Some(Utc::now());
        Ok(obj.clone())
    }
}

#[async_trait]
impl BlobStore for FakeBackend {
    async fn put(&self, target: &SignedUrl, body: Bytes) -> BackendResult<()> {
        self.record("blob_put", &target.url)?;
        let mut state = self.state.lock().unwrap();
        if state.blob_put_fails {
            return Err(BackendError::status(503, "blob store unavailable"));
        }
        state.blobs.insert(target.url.clone(), body);
        Ok(())
    }

    async fn get(&self, url: &str) -> BackendResult<ByteStream> {
        self.record("blob_get", url)?;
        let content = self
            .state
            .lock()
            .unwrap()
            .blobs
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))?;
        // two chunks, so readers have to reassemble
        let mid = content.len() / 2;
        let chunks = vec![Ok(content.slice(..mid)), Ok(content.slice(mid..))];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn authenticate(&self, username: &str, password: &str) -> BackendResult<AuthToken> {
        self.record("authenticate", username)?;
        let state = self.state.lock().unwrap();
        match state.users.get(username) {
            Some((expected, _)) if expected == password => Ok(AuthToken {
                access_token: format!("token-{username}"),
            }),
            _ => Err(BackendError::status(401, "invalid login")),
        }
    }

    async fn current_user(&self, token: &str) -> BackendResult<UserRecord> {
        self.record("current_user", token)?;
        let username = token.trim_start_matches("token-");
        let state = self.state.lock().unwrap();
        state
            .users
            .get(username)
            .map(|(_, user)| user.clone())
            .ok_or_else(|| BackendError::status(401, "unknown token"))
    }

    async fn role(&self, _token: &str, id: &str) -> BackendResult<RoleRecord> {
        self.record("role", id)?;
        self.state
            .lock()
            .unwrap()
            .roles
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }
}

// ----------------------------------------------------------------------
// Sessions and mounts
// ----------------------------------------------------------------------

/// Session allowed to delete, with the given global roles
pub fn session(uid: &str, roles: &[&str]) -> Arc<Session> {
    Arc::new(
        Session::new(uid, uid, format!("token-{uid}"))
            .with_roles(roles.iter().copied())
            .with_permissions([FILE_DELETE]),
    )
}

pub fn ctx(session: &Arc<Session>) -> RequestContext {
    RequestContext::new(Arc::clone(session))
}

pub fn mount(backend: &Arc<FakeBackend>, view: Arc<dyn RootView>) -> MountFs {
    mount_with_ttl(backend, view, Duration::from_secs(3600))
}

pub fn mount_with_ttl(backend: &Arc<FakeBackend>, view: Arc<dyn RootView>, ttl: Duration) -> MountFs {
    MountFs::new(view, backend.clone(), backend.clone(), ttl)
}

pub fn table(backend: &Arc<FakeBackend>) -> MountTable {
    MountTable::standard(backend.clone(), backend.clone(), Duration::from_secs(3600))
}

/// A course `Biology` (id c1) taught by u1, attended by u2, containing
///
/// ```text
/// /Biology/sub/doc.txt   "cells"
/// /Biology/old.txt       "mitochondria"
/// /Biology/hidden.txt    (no entry for anyone)
/// /Chemistry             (course c2, u1 teaches)
/// ```
pub fn course_fixture() -> Arc<FakeBackend> {
    let backend = FakeBackend::new();
    backend.add_course("c1", "Biology", &["u1"], &["u2"]);
    backend.add_course("c2", "Chemistry", &["u1"], &[]);
    backend.add_dir(
        "d-sub",
        "sub",
        "c1",
        None,
        vec![user_perm("u1", RWCD), role_perm("student", R)],
    );
    backend.add_file(
        "f-doc",
        "doc.txt",
        "c1",
        Some("d-sub"),
        vec![user_perm("u1", RWCD), role_perm("student", R)],
        b"cells",
    );
    backend.add_file(
        "f-old",
        "old.txt",
        "c1",
        None,
        vec![user_perm("u1", RWCD), role_perm("student", R)],
        b"mitochondria",
    );
    backend.add_file("f-hidden", "hidden.txt", "c1", None, vec![], b"secret");
    backend
}
