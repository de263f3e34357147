use crate::error::{ClientError, ClientResult};
use crate::models::{
    AddPermissionRequest, CreateDatasetRequest, CreateUserRequest, Dataset, DeleteFileRequest,
    Envelope, FileEntry, LoginRequest, LoginResponse, Permission, PermissionLevel, Pool,
    RestoreSnapshotRequest, Snapshot, SystemMetrics, User,
};
use crate::session::Session;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// The only pool the backend manages datasets in.
const POOL: &str = "naspool";

/// Path segment the backend reads as "dataset root" when listing or uploading.
const ROOT_SEGMENT: &str = "r";

/// Encode an identifier for use as a single URL path segment.
///
/// The backend decodes file paths and snapshot names from standard Base64.
pub fn encode_segment(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

fn dataset_path(id: &str) -> String {
    format!("/nas/pools/{}/datasets/{}", POOL, id)
}

/// Typed client for the NAS backend REST API.
#[derive(Clone)]
pub struct NasClient {
    base_url: String,
    http: Client,
}

impl NasClient {
    /// Create a client for the backend at `api_url` (origin only).
    pub fn new(api_url: &str) -> Self {
        Self {
            base_url: format!("{}/api/v1", api_url.trim_end_matches('/')),
            http: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        debug!(%method, path, "Backend request");
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match session {
            Some(s) => req.header(header::AUTHORIZATION, s.token()),
            None => req,
        }
    }

    /// Send a request and unwrap the `{status, data, message}` envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        req: RequestBuilder,
    ) -> ClientResult<Option<T>> {
        let response = req.send().await.map_err(|source| ClientError::Request {
            path: path.to_string(),
            source,
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Request {
                path: path.to_string(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
            warn!(path, status = status.as_u16(), %message, "Backend returned an error status");
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        if !envelope.is_success() {
            return Err(ClientError::Rejected {
                path: path.to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("status '{}'", envelope.status)),
            });
        }

        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(&self, session: &Session, path: &str) -> ClientResult<T> {
        let req = self.request(Method::GET, path, Some(session));
        self.send(path, req)
            .await?
            .ok_or_else(|| ClientError::MissingData(path.to_string()))
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> ClientResult<Vec<T>> {
        let req = self.request(Method::GET, path, Some(session));
        Ok(self.send(path, req).await?.unwrap_or_default())
    }

    async fn execute(&self, path: &str, req: RequestBuilder) -> ClientResult<()> {
        self.send::<serde_json::Value>(path, req).await.map(|_| ())
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let path = "/auth/login";
        let response = self
            .request(Method::POST, path, None)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|source| ClientError::Request {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let login: LoginResponse =
            response
                .json()
                .await
                .map_err(|e| ClientError::Decode {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
        Ok(login.token)
    }

    pub async fn system_metrics(&self, session: &Session) -> ClientResult<SystemMetrics> {
        self.fetch(session, "/metrics/system").await
    }

    /// Main pool summary; `None` when the backend has no pool.
    pub async fn main_pool(&self, session: &Session) -> ClientResult<Option<Pool>> {
        let path = "/nas/pools/main";
        let req = self.request(Method::GET, path, Some(session));
        self.send(path, req).await
    }

    pub async fn list_datasets(&self, session: &Session) -> ClientResult<Vec<Dataset>> {
        self.fetch_list(session, &format!("/nas/pools/{}/datasets", POOL))
            .await
    }

    pub async fn get_dataset(&self, session: &Session, id: &str) -> ClientResult<Dataset> {
        self.fetch(session, &dataset_path(id)).await
    }

    pub async fn create_dataset(
        &self,
        session: &Session,
        name: &str,
        quota: &str,
    ) -> ClientResult<()> {
        let path = format!("/nas/pools/{}/datasets", POOL);
        let req = self
            .request(Method::POST, &path, Some(session))
            .json(&CreateDatasetRequest {
                dataset_name: name,
                quota,
            });
        self.execute(&path, req).await
    }

    pub async fn delete_dataset(&self, session: &Session, id: &str) -> ClientResult<()> {
        let path = dataset_path(id);
        let req = self.request(Method::DELETE, &path, Some(session));
        self.execute(&path, req).await
    }

    /// Enable the NFS share with POST, disable it with DELETE.
    pub async fn set_share(&self, session: &Session, id: &str, enable: bool) -> ClientResult<()> {
        let path = format!("{}/nfs-share", dataset_path(id));
        let method = if enable { Method::POST } else { Method::DELETE };
        let req = self.request(method, &path, Some(session));
        self.execute(&path, req).await
    }

    pub async fn list_permissions(
        &self,
        session: &Session,
        id: &str,
    ) -> ClientResult<Vec<Permission>> {
        self.fetch_list(session, &format!("{}/nfs-share/permissions", dataset_path(id)))
            .await
    }

    pub async fn add_permission(
        &self,
        session: &Session,
        id: &str,
        user_id: u64,
        permission: PermissionLevel,
    ) -> ClientResult<()> {
        let path = format!("{}/nfs-share/permissions", dataset_path(id));
        let req = self
            .request(Method::POST, &path, Some(session))
            .json(&AddPermissionRequest {
                user_id,
                permission,
            });
        self.execute(&path, req).await
    }

    pub async fn delete_permission(
        &self,
        session: &Session,
        id: &str,
        permission_id: u64,
    ) -> ClientResult<()> {
        let path = format!(
            "{}/nfs-share/permissions/{}",
            dataset_path(id),
            permission_id
        );
        let req = self.request(Method::DELETE, &path, Some(session));
        self.execute(&path, req).await
    }

    pub async fn list_files(&self, session: &Session, id: &str) -> ClientResult<Vec<FileEntry>> {
        self.fetch_list(session, &format!("{}/files/{}", dataset_path(id), ROOT_SEGMENT))
            .await
    }

    /// Upload one file into the dataset root as multipart field `file`.
    pub async fn upload_file(
        &self,
        session: &Session,
        id: &str,
        file_name: String,
        content: Vec<u8>,
    ) -> ClientResult<()> {
        let path = format!("{}/files/{}", dataset_path(id), ROOT_SEGMENT);
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);
        let req = self
            .request(Method::POST, &path, Some(session))
            .multipart(form);
        self.execute(&path, req).await
    }

    /// Delete a file or directory by its path relative to the dataset root.
    pub async fn delete_file(
        &self,
        session: &Session,
        id: &str,
        relative_path: &str,
    ) -> ClientResult<()> {
        let path = format!(
            "{}/files/{}",
            dataset_path(id),
            encode_segment(relative_path)
        );
        let req = self
            .request(Method::DELETE, &path, Some(session))
            .json(&DeleteFileRequest {
                path: relative_path,
            });
        self.execute(&path, req).await
    }

    pub async fn list_snapshots(&self, session: &Session, id: &str) -> ClientResult<Vec<Snapshot>> {
        self.fetch_list(session, &format!("{}/snapshots", dataset_path(id)))
            .await
    }

    pub async fn create_snapshot(&self, session: &Session, id: &str) -> ClientResult<()> {
        let path = format!("{}/snapshots", dataset_path(id));
        let req = self
            .request(Method::POST, &path, Some(session))
            .json(&serde_json::json!({}));
        self.execute(&path, req).await
    }

    pub async fn restore_snapshot(
        &self,
        session: &Session,
        id: &str,
        snapshot_name: &str,
    ) -> ClientResult<()> {
        let path = format!("{}/snapshots/restore", dataset_path(id));
        let req = self
            .request(Method::POST, &path, Some(session))
            .json(&RestoreSnapshotRequest { snapshot_name });
        self.execute(&path, req).await
    }

    pub async fn delete_snapshot(
        &self,
        session: &Session,
        id: &str,
        snapshot_name: &str,
    ) -> ClientResult<()> {
        let path = format!(
            "{}/snapshots/{}",
            dataset_path(id),
            encode_segment(snapshot_name)
        );
        let req = self.request(Method::DELETE, &path, Some(session));
        self.execute(&path, req).await
    }

    pub async fn list_users(&self, session: &Session) -> ClientResult<Vec<User>> {
        self.fetch_list(session, "/users").await
    }

    pub async fn create_user(
        &self,
        session: &Session,
        user: &CreateUserRequest<'_>,
    ) -> ClientResult<()> {
        let path = "/users";
        let req = self.request(Method::POST, path, Some(session)).json(user);
        self.execute(path, req).await
    }

    pub async fn delete_user(&self, session: &Session, user_id: u64) -> ClientResult<()> {
        let path = format!("/users/{}", user_id);
        let req = self.request(Method::DELETE, &path, Some(session));
        self.execute(&path, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use mockito::Matcher;
    use serde_json::json;

    fn session() -> Session {
        Session::from_token("tok-123".to_string())
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("a/b.txt"), "YS9iLnR4dA==");
        assert_eq!(encode_segment("snap1"), "c25hcDE=");
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/login")
            .match_body(Matcher::Json(json!({"username": "admin@nas", "password": "pw"})))
            .with_status(200)
            .with_body(r#"{"token":"jwt-abc"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        let token = client.login("admin@nas", "pw").await.unwrap();
        assert_eq!(token, "jwt-abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_failure_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(401)
            .with_body(r#"{"error":"invalid password"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        let err = client.login("admin@nas", "bad").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_raw_token_header_and_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/nas/pools/naspool/datasets")
            .match_header("authorization", "tok-123")
            .with_status(200)
            .with_body(
                r#"{"status":"success","data":[{"id":"bmFzcG9vbC9h","name":"naspool/a","quota":"10G","used":"1M","available":"9G","shareEnabled":true}]}"#,
            )
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        let datasets = client.list_datasets(&session()).await.unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "naspool/a");
        assert!(datasets[0].share_enabled);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_list_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/users")
            .with_status(200)
            .with_body(r#"{"status":"success","data":null}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        assert!(client.list_users(&session()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/metrics/system")
            .with_status(200)
            .with_body(r#"{"status":"error","message":"no metrics"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        match client.system_metrics(&session()).await {
            Err(ClientError::Rejected { message, .. }) => assert_eq!(message, "no metrics"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_reads_msg() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/users/7")
            .with_status(401)
            .with_body(r#"{"status":"error","msg":"permission denied"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        match client.delete_user(&session(), 7).await {
            Err(ClientError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_share_toggle_verbs() {
        let mut server = mockito::Server::new_async().await;
        let enable = server
            .mock("POST", "/api/v1/nas/pools/naspool/datasets/ds1/nfs-share")
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let disable = server
            .mock("DELETE", "/api/v1/nas/pools/naspool/datasets/ds1/nfs-share")
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        client.set_share(&session(), "ds1", true).await.unwrap();
        client.set_share(&session(), "ds1", false).await.unwrap();
        enable.assert_async().await;
        disable.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_file_encodes_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "DELETE",
                "/api/v1/nas/pools/naspool/datasets/ds1/files/YS9iLnR4dA==",
            )
            .match_body(Matcher::Json(json!({"path": "a/b.txt"})))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        client
            .delete_file(&session(), "ds1", "a/b.txt")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_snapshot_restore_and_delete() {
        let mut server = mockito::Server::new_async().await;
        let restore = server
            .mock(
                "POST",
                "/api/v1/nas/pools/naspool/datasets/ds1/snapshots/restore",
            )
            .match_body(Matcher::Json(json!({"snapshotName": "snap1"})))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let delete = server
            .mock(
                "DELETE",
                "/api/v1/nas/pools/naspool/datasets/ds1/snapshots/c25hcDE=",
            )
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        client
            .restore_snapshot(&session(), "ds1", "snap1")
            .await
            .unwrap();
        client
            .delete_snapshot(&session(), "ds1", "snap1")
            .await
            .unwrap();
        restore.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_user_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/users")
            .match_body(Matcher::Json(json!({
                "name": "ann",
                "email": "ann@nas",
                "password": "secret",
                "nasClientIP": "10.0.0.5",
                "role": "ROLE_ADMIN"
            })))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        client
            .create_user(
                &session(),
                &CreateUserRequest {
                    name: "ann",
                    email: "ann@nas",
                    password: "secret",
                    nas_client_ip: "10.0.0.5",
                    role: Role::Admin,
                },
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_is_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/nas/pools/naspool/datasets/ds1/files/r")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::Regex(r#"name="file"; filename="notes.txt""#.to_string()))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = NasClient::new(&server.url());
        client
            .upload_file(&session(), "ds1", "notes.txt".to_string(), b"hello".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
