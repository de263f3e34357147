use crate::client::NasClient;
use crate::config::WebConfig;
use crate::session::session_guard;
use askama::Template;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod dashboard;
mod datasets;
mod filesystem;
mod login;
mod snapshots;
mod users;

/// Embedded CSS stylesheet
const STYLESHEET: &str = include_str!("../../static/style.css");

/// Event fired on the triggering element after a successful form submission.
/// Modals listen for it to close themselves.
const SAVED_EVENT: &str = "nas-saved";

pub struct WebState {
    pub client: NasClient,
    pub config: WebConfig,
}

impl WebState {
    pub fn new(config: WebConfig) -> Self {
        Self {
            client: NasClient::new(&config.api_url),
            config,
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    const TIB: u64 = GIB * 1024;

    if bytes >= TIB {
        format!("{:.2} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Percent-encode a backend identifier for use in our own links.
fn href_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Inline feedback message shown in the page's notice area.
#[derive(Clone)]
pub(crate) struct Notice {
    kind: &'static str,
    message: String,
}

impl Notice {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

/// Out-of-band notice, optionally with nothing else in the body.
#[derive(Template)]
#[template(path = "partials/notice.html")]
pub(crate) struct NoticeTemplate {
    notice: Option<Notice>,
}

struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!("Template error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Successful mutation answered with a fragment: fire the saved event so
/// open modals close.
fn saved<T: Template>(template: T) -> Response {
    (
        [(
            HeaderName::from_static("hx-trigger"),
            HeaderValue::from_static(SAVED_EVENT),
        )],
        HtmlTemplate(template),
    )
        .into_response()
}

/// Row deleted on the backend: an empty main body makes htmx drop the row
/// from the rendered list.
fn removed(notice: Option<Notice>) -> Response {
    HtmlTemplate(NoticeTemplate { notice }).into_response()
}

/// Failed mutation: leave the page as it is and only show the notice.
fn failed(message: &str) -> Response {
    (
        [(
            HeaderName::from_static("hx-reswap"),
            HeaderValue::from_static("none"),
        )],
        HtmlTemplate(NoticeTemplate {
            notice: Some(Notice::error(message)),
        }),
    )
        .into_response()
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Serve the embedded CSS stylesheet
async fn serve_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLESHEET,
    )
}

pub fn build_web_router(state: Arc<WebState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(login::login_page).post(login::login_submit))
        .route("/logout", get(login::logout_handler))
        .route("/static/style.css", get(serve_css));

    let protected_routes = Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/datasets", post(dashboard::create_dataset))
        .route(
            "/dataset/{id}",
            get(datasets::dataset_page).delete(datasets::delete_dataset),
        )
        .route("/dataset/{id}/share", post(datasets::toggle_share))
        .route("/dataset/{id}/permissions", post(datasets::add_permission))
        .route(
            "/dataset/{id}/permissions/{permission_id}",
            delete(datasets::delete_permission),
        )
        .route(
            "/dataset/{id}/filesystem",
            get(filesystem::filesystem_page),
        )
        .route(
            "/dataset/{id}/files",
            post(filesystem::upload_file).layer(upload_limit),
        )
        .route("/dataset/{id}/files/delete", post(filesystem::delete_file))
        .route(
            "/dataset/{id}/snapshots",
            get(snapshots::snapshots_page).post(snapshots::create_snapshot),
        )
        .route(
            "/dataset/{id}/snapshots/restore",
            post(snapshots::restore_snapshot),
        )
        .route(
            "/dataset/{id}/snapshots/delete",
            post(snapshots::delete_snapshot),
        )
        .route("/users", get(users::users_page).post(users::create_user))
        .route("/users/{id}", delete(users::delete_user))
        .route_layer(middleware::from_fn(session_guard));

    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request};
    use chrono::Duration;
    use tower::ServiceExt;

    pub const TOKEN: &str = "tok-123";

    pub fn router_for(server: &mockito::Server) -> Router {
        let config = WebConfig {
            api_url: server.url(),
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            session_lifetime: Duration::hours(2),
            secure_cookie: false,
            max_upload_bytes: 1024 * 1024,
        };
        build_web_router(Arc::new(WebState::new(config)))
    }

    pub fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("auth_token={}", TOKEN))
            .header("hx-request", "true")
    }

    pub fn form(method: &str, uri: &str, body: &str) -> Request<Body> {
        authed(method, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }
}
