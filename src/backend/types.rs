use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::vfs::{Permissions, Resource, ResourceKind};

/// What a permission entry's `refId` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefModel {
    User,
    Role,
}

/// Access-control record attached to a backend object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub ref_id: String,
    pub ref_perm_model: RefModel,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub delete: bool,
}

impl PermissionEntry {
    pub fn bits(&self) -> Permissions {
        Permissions {
            read: self.read,
            write: self.write,
            create: self.create,
            delete: self.delete,
        }
    }
}

/// File or directory as returned by the file storage endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileObject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl FileObject {
    pub fn kind(&self) -> ResourceKind {
        if self.is_directory {
            ResourceKind::Directory
        } else {
            ResourceKind::File
        }
    }

    /// Size in bytes; negative sizes mean "unknown"
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.and_then(|s| u64::try_from(s).ok())
    }

    /// Build the cached form of this object with already-resolved permissions
    pub fn into_resource(self, permissions: Permissions) -> Resource {
        let kind = self.kind();
        let size = self.size_bytes();
        let mut resource = Resource::directory(self.id);
        resource.kind = kind;
        resource.size = size;
        resource.created_at = self.created_at;
        resource.updated_at = self.updated_at;
        resource.permissions = permissions;
        resource.owner = self.owner;
        resource.creator = self.creator;
        resource
    }
}

/// Course as returned by the courses endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub teacher_ids: Vec<String>,
    #[serde(default)]
    pub substitution_ids: Vec<String>,
}

impl Course {
    /// Role of `uid` in this course ("teacher", "substitute", "student")
    pub fn role_of(&self, uid: &str) -> Option<&'static str> {
        let has = |ids: &[String]| ids.iter().any(|id| id == uid);
        if has(&self.teacher_ids) {
            Some(COURSE_TEACHER)
        } else if has(&self.substitution_ids) {
            Some(COURSE_SUBSTITUTE)
        } else if has(&self.user_ids) {
            Some(COURSE_STUDENT)
        } else {
            None
        }
    }
}

pub const COURSE_TEACHER: &str = "teacher";
pub const COURSE_SUBSTITUTE: &str = "substitute";
pub const COURSE_STUDENT: &str = "student";

/// Team membership record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Team as returned by the teams endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<TeamMember>,
}

impl Team {
    pub fn role_of(&self, uid: &str) -> Option<String> {
        self.user_ids
            .iter()
            .find(|member| member.user_id == uid)
            .and_then(|member| member.role.clone())
    }
}

/// Owner / parent pair addressing a directory in backend requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListScope {
    pub owner: String,
    pub parent: Option<String>,
}

impl ListScope {
    pub fn new(owner: impl Into<String>, parent: Option<String>) -> Self {
        ListScope {
            owner: owner.into(),
            parent,
        }
    }
}

/// Body for creating a directory or an empty office document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObject {
    pub name: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// What a signed upload URL is requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// Overwrite the content of an existing object
    Existing { id: String },
    /// Create a new object under `scope`
    New {
        scope: ListScope,
        filename: String,
        mime: String,
    },
}

/// Pre-authorized blob store endpoint issued by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

/// Header carrying the storage name the blob store assigned to an upload
pub const STORAGE_NAME_HEADER: &str = "x-amz-meta-flat-name";

impl SignedUrl {
    pub fn storage_name(&self) -> Option<&str> {
        self.header.get(STORAGE_NAME_HEADER).map(|s| s.as_str())
    }
}

/// Metadata registering an uploaded blob as a new backend file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFile {
    pub name: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
    pub storage_file_name: String,
}

/// Access token returned by the authentication endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub access_token: String,
}

/// The authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// One node of the nested role tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}
