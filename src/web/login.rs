use super::{HtmlTemplate, WebState};
use crate::session::{clear_cookie, session_cookie};
use askama::Template;
use axum::{
    Form,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    username: String,
    error: Option<String>,
}

pub(super) async fn login_page() -> impl IntoResponse {
    HtmlTemplate(LoginTemplate {
        username: String::new(),
        error: None,
    })
}

#[derive(Deserialize)]
pub(super) struct LoginForm {
    username: String,
    password: String,
}

pub(super) async fn login_submit(
    State(state): State<Arc<WebState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            HtmlTemplate(LoginTemplate {
                username: username.to_string(),
                error: Some("Username and password are required.".to_string()),
            }),
        )
            .into_response();
    }

    match state.client.login(username, &form.password).await {
        Ok(token) => {
            tracing::info!(username, "User logged in");
            (
                [(header::SET_COOKIE, session_cookie(&token, &state.config))],
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(username, error = %e, "Login failed");
            (
                StatusCode::UNAUTHORIZED,
                HtmlTemplate(LoginTemplate {
                    username: username.to_string(),
                    error: Some(LOGIN_FAILED.to_string()),
                }),
            )
                .into_response()
        }
    }
}

pub(super) async fn logout_handler() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_cookie())],
        Redirect::to("/login"),
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use mockito::Matcher;
    use serde_json::json;

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_redirects() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/auth/login")
            .match_body(Matcher::Json(json!({"username": "admin", "password": "pw"})))
            .with_body(r#"{"token":"abc.def.ghi"}"#)
            .create_async()
            .await;

        let (status, headers, _) =
            send(router_for(&server), login_request("username=admin&password=pw")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/dashboard");
        let cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("auth_token=abc.def.ghi;"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_failure_shows_message_without_cookie() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(401)
            .with_body(r#"{"error":"invalid credentials"}"#)
            .create_async()
            .await;

        let (status, headers, body) =
            send(router_for(&server), login_request("username=admin&password=bad")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.get(header::SET_COOKIE).is_none());
        assert!(body.contains("Login failed. Please check your credentials."));
        assert!(body.contains(r#"value="admin""#));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let server = mockito::Server::new_async().await;
        let (status, _, body) =
            send(router_for(&server), login_request("username=admin&password=")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("Username and password are required."));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let server = mockito::Server::new_async().await;
        let request = Request::builder().uri("/logout").body(Body::empty()).unwrap();
        let (status, headers, _) = send(router_for(&server), request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/login");
        assert!(
            headers[header::SET_COOKIE]
                .to_str()
                .unwrap()
                .contains("Max-Age=0")
        );
    }
}
