use super::{HtmlTemplate, Notice, WebState, failed, removed, saved};
use crate::models::{CreateUserRequest, Role, User};
use crate::session::Session;
use askama::Template;
use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    client_ip: String,
    role: &'static str,
}

impl From<User> for UserRow {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            role: u.role.label(),
            name: u.name,
            email: u.email,
            client_ip: u.nas_client_ip,
        }
    }
}

fn user_rows(users: Vec<User>) -> Vec<UserRow> {
    users.into_iter().map(UserRow::from).collect()
}

#[derive(Template)]
#[template(path = "users.html")]
struct UsersTemplate {
    active_page: String,
    users: Vec<UserRow>,
}

#[derive(Template)]
#[template(path = "partials/user_rows_fragment.html")]
struct UserRowsFragment {
    users: Vec<UserRow>,
    notice: Option<Notice>,
}

pub(super) async fn users_page(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let users = state
        .client
        .list_users(&session)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching users"))
        .unwrap_or_default();

    HtmlTemplate(UsersTemplate {
        active_page: "users".to_string(),
        users: user_rows(users),
    })
}

#[derive(Deserialize)]
pub(super) struct CreateUserForm {
    name: String,
    email: String,
    password: String,
    nas_client_ip: String,
    role: String,
}

pub(super) async fn create_user(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<CreateUserForm>,
) -> Response {
    let name = form.name.trim();
    let email = form.email.trim();
    let nas_client_ip = form.nas_client_ip.trim();
    if name.is_empty() || email.is_empty() || form.password.is_empty() || nas_client_ip.is_empty()
    {
        return failed("All fields are required.");
    }

    let request = CreateUserRequest {
        name,
        email,
        password: &form.password,
        nas_client_ip,
        role: Role::from(form.role.clone()),
    };

    if let Err(e) = state.client.create_user(&session, &request).await {
        tracing::error!(error = %e, user = name, "Error creating user");
        return failed("Failed to add user.");
    }

    tracing::info!(user = name, role = ?request.role, "User created");

    let users = state
        .client
        .list_users(&session)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error fetching users"))
        .unwrap_or_default();

    saved(UserRowsFragment {
        users: user_rows(users),
        notice: Some(Notice::success("User added successfully.")),
    })
}

pub(super) async fn delete_user(
    State(state): State<Arc<WebState>>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<u64>,
) -> Response {
    match state.client.delete_user(&session, user_id).await {
        Ok(()) => {
            tracing::info!(user_id, "User deleted");
            removed(Some(Notice::success("User deleted successfully.")))
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, "Error deleting user");
            failed("Failed to delete user.")
        }
    }
}
