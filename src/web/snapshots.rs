use super::datasets::DatasetHeader;
use super::{HtmlTemplate, Notice, WebState, failed, href_id, removed};
use crate::models::Snapshot;
use crate::session::Session;
use askama::Template;
use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Template)]
#[template(path = "snapshots.html")]
struct SnapshotsTemplate {
    active_page: String,
    active_tab: String,
    href_id: String,
    dataset: Option<DatasetHeader>,
    snapshots: Vec<Snapshot>,
}

#[derive(Template)]
#[template(path = "partials/snapshot_rows_fragment.html")]
struct SnapshotRowsFragment {
    href_id: String,
    snapshots: Vec<Snapshot>,
    notice: Option<Notice>,
}

pub(super) async fn snapshots_page(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (dataset, snapshots) = tokio::join!(
        state.client.get_dataset(&session, &id),
        state.client.list_snapshots(&session, &id),
    );

    HtmlTemplate(SnapshotsTemplate {
        active_page: "dashboard".to_string(),
        active_tab: "snapshots".to_string(),
        href_id: href_id(&id),
        dataset: dataset
            .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching dataset"))
            .ok()
            .map(DatasetHeader::from),
        snapshots: snapshots
            .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching snapshots"))
            .unwrap_or_default(),
    })
}

pub(super) async fn create_snapshot(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = state.client.create_snapshot(&session, &id).await {
        tracing::error!(error = %e, dataset = %id, "Error creating snapshot");
        return failed("Failed to create snapshot.");
    }

    tracing::info!(dataset = %id, "Snapshot created");

    let snapshots = state
        .client
        .list_snapshots(&session, &id)
        .await
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching snapshots"))
        .unwrap_or_default();

    HtmlTemplate(SnapshotRowsFragment {
        href_id: href_id(&id),
        snapshots,
        notice: Some(Notice::success("Snapshot created successfully.")),
    })
    .into_response()
}

#[derive(Deserialize)]
pub(super) struct SnapshotForm {
    snapshot_name: String,
}

pub(super) async fn restore_snapshot(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<SnapshotForm>,
) -> Response {
    match state
        .client
        .restore_snapshot(&session, &id, &form.snapshot_name)
        .await
    {
        Ok(()) => {
            tracing::info!(dataset = %id, snapshot = %form.snapshot_name, "Snapshot restored");
            removed(Some(Notice::success("Snapshot restored successfully.")))
        }
        Err(e) => {
            tracing::error!(error = %e, dataset = %id, snapshot = %form.snapshot_name, "Error restoring snapshot");
            failed("Failed to restore snapshot.")
        }
    }
}

pub(super) async fn delete_snapshot(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<SnapshotForm>,
) -> Response {
    match state
        .client
        .delete_snapshot(&session, &id, &form.snapshot_name)
        .await
    {
        Ok(()) => {
            tracing::info!(dataset = %id, snapshot = %form.snapshot_name, "Snapshot deleted");
            removed(Some(Notice::success("Snapshot deleted successfully.")))
        }
        Err(e) => {
            tracing::error!(error = %e, dataset = %id, snapshot = %form.snapshot_name, "Error deleting snapshot");
            failed("Failed to delete snapshot.")
        }
    }
}
