use super::{HtmlTemplate, Notice, WebState, failed, href_id, saved};
use crate::models::{Dataset, Pool, SystemMetrics};
use crate::session::Session;
use askama::Template;
use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
struct GaugeView {
    label: &'static str,
    percent: String,
    /// Filled arc of the ring, 0-360.
    degrees: u32,
    detail: String,
}

impl GaugeView {
    fn new(label: &'static str, percent: f64, detail: String) -> Self {
        let clamped = percent.clamp(0.0, 100.0);
        Self {
            label,
            percent: format!("{:.1}%", percent),
            degrees: (clamped * 3.6).round() as u32,
            detail,
        }
    }
}

fn gauges(m: &SystemMetrics) -> Vec<GaugeView> {
    vec![
        GaugeView::new(
            "CPU Usage",
            m.cpu_usage_percent,
            format!("Total CPUs: {}", m.total_cpus),
        ),
        GaugeView::new(
            "Memory Usage",
            m.memory_percent,
            format!(
                "Total Memory: {} ({} used)",
                format_gb(m.total_memory),
                format_gb(m.memory_used)
            ),
        ),
        GaugeView::new(
            "Disk Usage",
            m.disk_percent,
            format!(
                "Total Disk: {} ({} used)",
                format_gb(m.total_disk),
                format_gb(m.disk_used)
            ),
        ),
    ]
}

fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / (1u64 << 30) as f64)
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

#[derive(Clone)]
struct DatasetRow {
    href_id: String,
    name: String,
    quota: String,
    used: String,
    available: String,
    share_enabled: bool,
}

impl From<Dataset> for DatasetRow {
    fn from(d: Dataset) -> Self {
        Self {
            href_id: href_id(&d.id),
            name: d.name,
            quota: d.quota,
            used: d.used,
            available: d.available,
            share_enabled: d.share_enabled,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    active_page: String,
    gauges: Vec<GaugeView>,
    uptime: Option<String>,
    pool: Option<Pool>,
    datasets: Vec<DatasetRow>,
}

#[derive(Template)]
#[template(path = "partials/dataset_rows_fragment.html")]
struct DatasetRowsFragment {
    datasets: Vec<DatasetRow>,
    notice: Option<Notice>,
}

pub(super) async fn dashboard(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let (metrics, datasets, pool) = tokio::join!(
        state.client.system_metrics(&session),
        state.client.list_datasets(&session),
        state.client.main_pool(&session),
    );

    let metrics = metrics
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching system metrics"))
        .ok();
    let datasets = datasets
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching datasets"))
        .unwrap_or_default();
    let pool = pool
        .inspect_err(|e| tracing::warn!(error = %e, "Error fetching main pool"))
        .ok()
        .flatten();

    HtmlTemplate(DashboardTemplate {
        active_page: "dashboard".to_string(),
        gauges: metrics.as_ref().map(gauges).unwrap_or_default(),
        uptime: metrics.as_ref().map(|m| format_uptime(m.uptime)),
        pool,
        datasets: datasets.into_iter().map(DatasetRow::from).collect(),
    })
}

#[derive(Deserialize)]
pub(super) struct CreateDatasetForm {
    dataset_name: String,
    quota: String,
}

pub(super) async fn create_dataset(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<CreateDatasetForm>,
) -> Response {
    let name = form.dataset_name.trim();
    let quota = form.quota.trim();
    if name.is_empty() || quota.is_empty() {
        return failed("Dataset name and quota are required.");
    }

    if let Err(e) = state.client.create_dataset(&session, name, quota).await {
        tracing::error!(error = %e, dataset = name, "Error creating dataset");
        return failed("Failed to create dataset. Please try again.");
    }

    tracing::info!(dataset = name, quota, "Dataset created");

    let datasets = state
        .client
        .list_datasets(&session)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching datasets"))
        .unwrap_or_default();

    saved(DatasetRowsFragment {
        datasets: datasets.into_iter().map(DatasetRow::from).collect(),
        notice: Some(Notice::success("Dataset created successfully!")),
    })
}
