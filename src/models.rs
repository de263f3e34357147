//! Wire types of the NAS backend API.
//!
//! Field names follow the backend's JSON exactly; every entity here is a
//! transient copy of backend state.

use serde::{Deserialize, Serialize};

/// Response wrapper used by every backend endpoint except login.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// System resource gauges shown on the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub total_cpus: u32,
    pub cpu_usage_percent: f64,
    pub total_memory: u64,
    #[serde(default)]
    pub memory_used: u64,
    pub memory_percent: f64,
    pub total_disk: u64,
    #[serde(default)]
    pub disk_used: u64,
    pub disk_percent: f64,
    /// Seconds since boot.
    #[serde(default)]
    pub uptime: u64,
}

/// Summary of the main storage pool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub name: String,
    pub size: String,
    pub allocated: String,
    pub free: String,
    #[serde(default)]
    pub fragmented: String,
    pub health: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub quota: String,
    pub used: String,
    pub available: String,
    #[serde(default)]
    pub share_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest<'a> {
    pub dataset_name: &'a str,
    pub quota: &'a str,
}

/// Role of a NAS user. Unknown roles read as plain users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ROLE_ADMIN" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(rename = "nasClientIP")]
    pub nas_client_ip: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct CreateUserRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "nasClientIP")]
    pub nas_client_ip: &'a str,
    pub role: Role,
}

/// Access level granted on a dataset's NFS share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum PermissionLevel {
    #[serde(rename = "r")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl From<String> for PermissionLevel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rw" => PermissionLevel::ReadWrite,
            _ => PermissionLevel::ReadOnly,
        }
    }
}

impl PermissionLevel {
    pub fn label(&self) -> &'static str {
        match self {
            PermissionLevel::ReadOnly => "Read-Only",
            PermissionLevel::ReadWrite => "Read & Write",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    pub id: u64,
    pub user: User,
    pub permission: PermissionLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPermissionRequest {
    pub user_id: u64,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a dataset's flat filesystem listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "IsDir", default)]
    pub is_dir: Option<bool>,
}

impl FileEntry {
    /// Entry kind. Backends that omit `IsDir` report directories with size 0,
    /// so an empty file reads as a directory there.
    pub fn kind(&self) -> EntryKind {
        match self.is_dir {
            Some(true) => EntryKind::Directory,
            Some(false) => EntryKind::File,
            None if self.size == 0 => EntryKind::Directory,
            None => EntryKind::File,
        }
    }

    /// Path relative to the dataset mountpoint `/<dataset_name>`.
    ///
    /// The backend lists absolute paths but deletes by relative path.
    /// `None` when the dataset name is unknown or the entry lies outside
    /// the mount; such entries cannot be addressed for deletion.
    pub fn relative_path(&self, dataset_name: &str) -> Option<String> {
        let dataset_name = dataset_name.trim_matches('/');
        if dataset_name.is_empty() {
            return None;
        }
        let rest = self
            .path
            .strip_prefix('/')?
            .strip_prefix(dataset_name)?
            .strip_prefix('/')?
            .trim_start_matches('/');
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteFileRequest<'a> {
    pub path: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub name: String,
    pub used: String,
    pub referenced: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSnapshotRequest<'a> {
    pub snapshot_name: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_msg_alias() {
        let env: Envelope<Vec<Dataset>> =
            serde_json::from_str(r#"{"status":"error","msg":"unauthorized request"}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.data.is_none());
        assert_eq!(env.message.as_deref(), Some("unauthorized request"));
    }

    #[test]
    fn test_entry_kind() {
        let entry = |size, is_dir| FileEntry {
            path: "/naspool/docs/a".to_string(),
            name: "a".to_string(),
            size,
            is_dir,
        };
        assert_eq!(entry(0, None).kind(), EntryKind::Directory);
        assert_eq!(entry(12, None).kind(), EntryKind::File);
        assert_eq!(entry(0, Some(false)).kind(), EntryKind::File);
        assert_eq!(entry(4096, Some(true)).kind(), EntryKind::Directory);
    }

    #[test]
    fn test_relative_path() {
        let entry: FileEntry = serde_json::from_str(
            r#"{"Path":"/naspool/docs/a/b.txt","Name":"b.txt","Size":3}"#,
        )
        .unwrap();
        assert_eq!(entry.relative_path("naspool/docs").as_deref(), Some("a/b.txt"));
        assert_eq!(entry.relative_path("/naspool/docs/").as_deref(), Some("a/b.txt"));
    }

    #[test]
    fn test_relative_path_never_guesses_by_name() {
        let entry: FileEntry = serde_json::from_str(
            r#"{"Path":"/naspool/docs/a/b.txt","Name":"b.txt","Size":3}"#,
        )
        .unwrap();
        assert_eq!(entry.relative_path(""), None);
        assert_eq!(entry.relative_path("naspool/other"), None);
        assert_eq!(entry.relative_path("naspool/do"), None);

        let mount: FileEntry =
            serde_json::from_str(r#"{"Path":"/naspool/docs","Name":"docs","Size":0}"#).unwrap();
        assert_eq!(mount.relative_path("naspool/docs"), None);
    }

    #[test]
    fn test_unknown_role_and_permission() {
        let perm: Permission = serde_json::from_str(
            r#"{"id":4,"permission":"x","user":{"id":1,"name":"ann","email":"a@b","nasClientIP":"10.0.0.2","role":"ROLE_AUDITOR"}}"#,
        )
        .unwrap();
        assert_eq!(perm.permission, PermissionLevel::ReadOnly);
        assert_eq!(perm.user.role, Role::User);
        assert_eq!(
            serde_json::to_value(Role::Admin).unwrap(),
            serde_json::json!("ROLE_ADMIN")
        );
        assert_eq!(
            serde_json::to_value(PermissionLevel::ReadWrite).unwrap(),
            serde_json::json!("rw")
        );
    }
}
