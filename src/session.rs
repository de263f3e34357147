use crate::config::WebConfig;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

/// Cookie holding the backend session token.
pub const TOKEN_COOKIE: &str = "auth_token";

/// Registered claims the console reads from a backend JWT.
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

/// Authenticated session context handed to every protected view.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from a raw backend token.
    ///
    /// JWTs contribute their `exp` claim. Opaque tokens have no known expiry
    /// and live as long as the cookie does.
    pub fn from_token(token: String) -> Self {
        let expires_at = token_expiry(&token);
        Self { token, expires_at }
    }

    /// Raw token, sent verbatim as the `Authorization` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Read `exp` from a JWT without verifying it. The signing secret belongs to
/// the backend, which still validates every request.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp?, 0)
}

/// Extract token from cookie
pub fn get_token_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let cookie = cookie.trim();
            cookie
                .strip_prefix(TOKEN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|value| !value.is_empty())
                .and_then(|value| urlencoding::decode(value).ok())
                .map(|value| value.into_owned())
        })
}

/// `Set-Cookie` value storing a freshly issued token.
pub fn session_cookie(token: &str, config: &WebConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        TOKEN_COOKIE,
        urlencoding::encode(token),
        config.session_lifetime.num_seconds()
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the token.
pub fn clear_cookie() -> String {
    format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict",
        TOKEN_COOKIE
    )
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Send the browser to the login page. htmx requests cannot follow a 303
/// into a full page swap, so they get `HX-Redirect` instead.
fn login_redirect(headers: &HeaderMap, clear: bool) -> Response {
    let mut response = if is_htmx(headers) {
        let mut r = StatusCode::UNAUTHORIZED.into_response();
        r.headers_mut()
            .insert("hx-redirect", HeaderValue::from_static("/login"));
        r
    } else {
        Redirect::to("/login").into_response()
    };

    if clear && let Ok(value) = HeaderValue::from_str(&clear_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Session guard - redirects to /login unless a live token is present
pub async fn session_guard(mut request: Request, next: Next) -> Response {
    let Some(token) = get_token_from_cookie(request.headers()) else {
        return login_redirect(request.headers(), false);
    };

    let session = Session::from_token(token);
    if session.is_expired_at(Utc::now()) {
        tracing::info!(expired_at = ?session.expires_at(), "Session expired");
        return login_redirect(request.headers(), true);
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}
