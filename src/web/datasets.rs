use super::{HtmlTemplate, Notice, WebState, failed, href_id, removed, saved};
use crate::models::{Dataset, Permission, PermissionLevel, User};
use crate::session::Session;
use askama::Template;
use axum::{
    Extension, Form,
    extract::{Path, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Heading data shared by the dataset detail, filesystem and snapshot pages.
#[derive(Clone)]
pub(super) struct DatasetHeader {
    pub(super) name: String,
    pub(super) quota: String,
    pub(super) used: String,
    pub(super) available: String,
}

impl From<Dataset> for DatasetHeader {
    fn from(d: Dataset) -> Self {
        Self {
            name: d.name,
            quota: d.quota,
            used: d.used,
            available: d.available,
        }
    }
}

#[derive(Clone)]
struct PermissionRow {
    id: u64,
    user_name: String,
    email: String,
    client_ip: String,
    role: &'static str,
    permission: &'static str,
}

impl From<Permission> for PermissionRow {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            role: p.user.role.label(),
            permission: p.permission.label(),
            user_name: p.user.name,
            email: p.user.email,
            client_ip: p.user.nas_client_ip,
        }
    }
}

#[derive(Clone)]
struct UserOption {
    id: u64,
    label: String,
}

impl From<User> for UserOption {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            label: format!("{} ({})", u.name, u.email),
        }
    }
}

#[derive(Template)]
#[template(path = "dataset.html")]
struct DatasetTemplate {
    active_page: String,
    active_tab: String,
    href_id: String,
    dataset: Option<DatasetHeader>,
    share_enabled: bool,
    permissions: Vec<PermissionRow>,
    users: Vec<UserOption>,
}

#[derive(Template)]
#[template(path = "partials/share_panel_fragment.html")]
struct SharePanelFragment {
    href_id: String,
    share_enabled: bool,
    notice: Option<Notice>,
}

#[derive(Template)]
#[template(path = "partials/permission_table_fragment.html")]
struct PermissionTableFragment {
    href_id: String,
    permissions: Vec<PermissionRow>,
    notice: Option<Notice>,
}

fn permission_rows(permissions: Vec<Permission>) -> Vec<PermissionRow> {
    permissions.into_iter().map(PermissionRow::from).collect()
}

pub(super) async fn dataset_page(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (dataset, permissions, users) = tokio::join!(
        state.client.get_dataset(&session, &id),
        state.client.list_permissions(&session, &id),
        state.client.list_users(&session),
    );

    let dataset = dataset
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching dataset"))
        .ok();
    let permissions = permissions
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching permissions"))
        .unwrap_or_default();
    let users = users
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching users"))
        .unwrap_or_default();

    HtmlTemplate(DatasetTemplate {
        active_page: "dashboard".to_string(),
        active_tab: "details".to_string(),
        href_id: href_id(&id),
        share_enabled: dataset.as_ref().is_some_and(|d| d.share_enabled),
        dataset: dataset.map(DatasetHeader::from),
        permissions: permission_rows(permissions),
        users: users.into_iter().map(UserOption::from).collect(),
    })
}

#[derive(Deserialize)]
pub(super) struct ShareForm {
    /// Share state the page was showing when the button was pressed.
    enabled: bool,
}

pub(super) async fn toggle_share(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<ShareForm>,
) -> Response {
    let enable = !form.enabled;
    if let Err(e) = state.client.set_share(&session, &id, enable).await {
        tracing::error!(error = %e, dataset = %id, enable, "Error updating NFS share");
        return failed("Failed to update share settings.");
    }

    tracing::info!(dataset = %id, enable, "NFS share updated");

    // Backend state wins; the requested state stands in when the re-fetch fails.
    let share_enabled = match state.client.get_dataset(&session, &id).await {
        Ok(dataset) => dataset.share_enabled,
        Err(e) => {
            tracing::warn!(error = %e, dataset = %id, "Error re-fetching dataset");
            enable
        }
    };

    let message = if enable {
        "NFS share enabled."
    } else {
        "NFS share disabled."
    };
    HtmlTemplate(SharePanelFragment {
        href_id: href_id(&id),
        share_enabled,
        notice: Some(Notice::success(message)),
    })
    .into_response()
}

pub(super) async fn delete_dataset(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    match state.client.delete_dataset(&session, &id).await {
        Ok(()) => {
            tracing::info!(dataset = %id, "Dataset deleted");
            [(
                HeaderName::from_static("hx-redirect"),
                HeaderValue::from_static("/dashboard"),
            )]
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, dataset = %id, "Error deleting dataset");
            failed("Failed to delete dataset.")
        }
    }
}

#[derive(Deserialize)]
pub(super) struct PermissionForm {
    user_id: String,
    permission: String,
}

pub(super) async fn add_permission(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<PermissionForm>,
) -> Response {
    let Ok(user_id) = form.user_id.trim().parse::<u64>() else {
        return failed("Please select a user.");
    };
    let permission = PermissionLevel::from(form.permission);

    if let Err(e) = state
        .client
        .add_permission(&session, &id, user_id, permission)
        .await
    {
        tracing::error!(error = %e, dataset = %id, user_id, "Error adding permission");
        return failed("Failed to add permission.");
    }

    tracing::info!(dataset = %id, user_id, ?permission, "Permission added");

    let permissions = state
        .client
        .list_permissions(&session, &id)
        .await
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching permissions"))
        .unwrap_or_default();

    saved(PermissionTableFragment {
        href_id: href_id(&id),
        permissions: permission_rows(permissions),
        notice: Some(Notice::success("Permission added successfully.")),
    })
}

pub(super) async fn delete_permission(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path((id, permission_id)): Path<(String, u64)>,
) -> Response {
    match state
        .client
        .delete_permission(&session, &id, permission_id)
        .await
    {
        Ok(()) => {
            tracing::info!(dataset = %id, permission_id, "Permission deleted");
            removed(Some(Notice::success("Permission deleted successfully.")))
        }
        Err(e) => {
            tracing::error!(error = %e, dataset = %id, permission_id, "Error deleting permission");
            failed("Failed to delete permission.")
        }
    }
}
