use super::datasets::DatasetHeader;
use super::{HtmlTemplate, Notice, WebState, failed, format_bytes, href_id, removed, saved};
use crate::models::{EntryKind, FileEntry};
use crate::session::Session;
use askama::Template;
use axum::{
    Extension, Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
struct FileRow {
    icon: &'static str,
    name: String,
    /// Path relative to the dataset root, as the backend expects on delete.
    /// Rows without one are listed but offer no delete action.
    path: Option<String>,
    size: String,
}

fn file_rows(entries: Vec<FileEntry>, dataset_name: &str) -> Vec<FileRow> {
    entries
        .into_iter()
        .map(|entry| {
            let (icon, size) = match entry.kind() {
                EntryKind::Directory => ("📁", String::new()),
                EntryKind::File => ("📄", format_bytes(entry.size)),
            };
            FileRow {
                icon,
                path: entry.relative_path(dataset_name),
                name: entry.name,
                size,
            }
        })
        .collect()
}

/// Layout of the listing. The markup is the same for both; the stylesheet
/// switches on the wrapper class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("grid") => ViewMode::Grid,
            _ => ViewMode::List,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
        }
    }
}

#[derive(Deserialize)]
pub(super) struct FilesystemQuery {
    view: Option<String>,
}

#[derive(Template)]
#[template(path = "filesystem.html")]
struct FilesystemTemplate {
    active_page: String,
    active_tab: String,
    href_id: String,
    view: &'static str,
    dataset: Option<DatasetHeader>,
    entries: Vec<FileRow>,
}

#[derive(Template)]
#[template(path = "partials/file_list_fragment.html")]
struct FileListFragment {
    href_id: String,
    entries: Vec<FileRow>,
    notice: Option<Notice>,
}

pub(super) async fn filesystem_page(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(query): Query<FilesystemQuery>,
) -> impl IntoResponse {
    let view = ViewMode::from_param(query.view.as_deref());
    let (dataset, files) = tokio::join!(
        state.client.get_dataset(&session, &id),
        state.client.list_files(&session, &id),
    );

    let dataset = dataset
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching dataset"))
        .ok()
        .map(DatasetHeader::from);
    let files = files
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching files"))
        .unwrap_or_default();

    let dataset_name = dataset.as_ref().map(|d| d.name.as_str()).unwrap_or_default();
    let entries = file_rows(files, dataset_name);

    HtmlTemplate(FilesystemTemplate {
        active_page: "dashboard".to_string(),
        active_tab: "filesystem".to_string(),
        href_id: href_id(&id),
        view: view.as_str(),
        dataset,
        entries,
    })
}

/// Re-read the listing after a mutation. Relative paths need the dataset name.
async fn reload_rows(state: &WebState, session: &Session, id: &str) -> Vec<FileRow> {
    let (dataset, files) = tokio::join!(
        state.client.get_dataset(session, id),
        state.client.list_files(session, id),
    );
    let dataset_name = dataset.map(|d| d.name).unwrap_or_default();
    let files = files
        .inspect_err(|e| tracing::error!(error = %e, dataset = %id, "Error fetching files"))
        .unwrap_or_default();
    file_rows(files, &dataset_name)
}

pub(super) async fn upload_file(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        tracing::warn!(error = %e, "Error reading uploaded file");
                        return failed("Failed to read the uploaded file.");
                    }
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed upload");
                return failed("Failed to read the uploaded file.");
            }
        }
    }

    let Some((file_name, content)) = upload else {
        return failed("Please select a file to upload.");
    };
    let size = content.len();

    if let Err(e) = state
        .client
        .upload_file(&session, &id, file_name.clone(), content)
        .await
    {
        tracing::error!(error = %e, dataset = %id, file = %file_name, "Error uploading file");
        return failed("Failed to upload file.");
    }

    tracing::info!(dataset = %id, file = %file_name, size, "File uploaded");

    saved(FileListFragment {
        href_id: href_id(&id),
        entries: reload_rows(&state, &session, &id).await,
        notice: Some(Notice::success("File uploaded successfully!")),
    })
}

#[derive(Deserialize)]
pub(super) struct DeleteFileForm {
    path: String,
}

pub(super) async fn delete_file(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<DeleteFileForm>,
) -> Response {
    if form.path.is_empty() {
        return failed("Failed to delete file.");
    }

    match state.client.delete_file(&session, &id, &form.path).await {
        Ok(()) => {
            tracing::info!(dataset = %id, path = %form.path, "File deleted");
            removed(None)
        }
        Err(e) => {
            tracing::error!(error = %e, dataset = %id, path = %form.path, "Error deleting file");
            failed("Failed to delete file.")
        }
    }
}
