use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthError,
    error::{AppError, Result},
    guard::LOGIN_PATH,
    models::Notice,
    session::CurrentSession,
    views::{LoginView, NotFoundView, SetupView},
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[utoipa::path(
    get,
    path = "/admin/login",
    responses((status = 200, description = "Login form", body = LoginView))
)]
pub async fn login_page(CurrentSession(session): CurrentSession) -> Json<LoginView> {
    Json(LoginView {
        email: String::new(),
        notices: session.take_notices(),
    })
}

/// login
///
/// [Public Route] Email/password sign-in. On failure the visitor stays on the
/// login form with a notice and the session is left untouched.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirect to the dashboard"),
        (status = 400, description = "Missing fields", body = LoginView),
        (status = 401, description = "Sign-in failed", body = LoginView)
    )
)]
pub async fn login(
    CurrentSession(session): CurrentSession,
    Form(request): Form<LoginRequest>,
) -> Response {
    let email = request.email.trim().to_string();

    if email.is_empty() || request.password.is_empty() {
        let notice = Notice::error("Error", "Please enter both email and password");
        return login_failure(StatusCode::BAD_REQUEST, email, notice);
    }

    match session.sign_in(&email, &request.password).await {
        Ok(signed_in) => {
            tracing::info!(user_id = %signed_in.user.id, "admin signed in");
            session.push_notice(Notice::success(
                "Login Successful",
                "Welcome to the admin dashboard",
            ));
            Redirect::to("/admin").into_response()
        }
        Err(AuthError::Network(e)) => {
            tracing::warn!(error = %e, "sign-in unreachable");
            let notice = Notice::error(
                "Login Error",
                "An unexpected error occurred. Please try again.",
            );
            login_failure(StatusCode::SERVICE_UNAVAILABLE, email, notice)
        }
        Err(e) => {
            tracing::info!(error = %e, "sign-in rejected");
            login_failure(
                StatusCode::UNAUTHORIZED,
                email,
                Notice::error("Login Failed", e.to_string()),
            )
        }
    }
}

fn login_failure(status: StatusCode, email: String, notice: Notice) -> Response {
    (
        status,
        Json(LoginView {
            email,
            notices: vec![notice],
        }),
    )
        .into_response()
}

/// logout
///
/// Ends the session locally even when the backend sign-out fails.
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses((status = 303, description = "Signed out, redirect to login"))
)]
pub async fn logout(CurrentSession(session): CurrentSession) -> Redirect {
    session.sign_out().await;
    session.push_notice(Notice::success("Signed out", "You have been signed out."));
    Redirect::to(LOGIN_PATH)
}

// --- One-time admin bootstrap ---

fn ensure_setup_enabled(state: &AppState) -> Result<()> {
    if state.config.setup_enabled {
        Ok(())
    } else {
        Err(AppError::NotFound(NotFoundView::page()))
    }
}

#[utoipa::path(
    get,
    path = "/admin/setup",
    responses(
        (status = 200, description = "Setup form", body = SetupView),
        (status = 404, description = "Setup disabled", body = NotFoundView)
    )
)]
pub async fn setup_page(State(state): State<AppState>) -> Result<Json<SetupView>> {
    ensure_setup_enabled(&state)?;
    Ok(Json(SetupView {
        email: String::new(),
        message: None,
    }))
}

/// setup
///
/// Registers the admin account with the auth service. The account must confirm
/// its email before it can sign in.
#[utoipa::path(
    post,
    path = "/admin/setup",
    request_body(content = SetupRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Account created", body = SetupView),
        (status = 400, description = "Invalid input", body = SetupView),
        (status = 422, description = "Rejected by the auth service", body = SetupView)
    )
)]
pub async fn setup(
    State(state): State<AppState>,
    Form(request): Form<SetupRequest>,
) -> Result<Response> {
    ensure_setup_enabled(&state)?;
    let email = request.email.trim().to_string();

    let invalid = if email.is_empty() || request.password.is_empty() {
        Some("Please enter both email and password")
    } else if request.password != request.confirm_password {
        Some("Passwords do not match")
    } else if request.password.len() < MIN_PASSWORD_LEN {
        Some("Password must be at least 8 characters long")
    } else {
        None
    };
    if let Some(message) = invalid {
        return Ok(setup_response(
            StatusCode::BAD_REQUEST,
            email,
            Notice::error("Error", message),
        ));
    }

    let response = match state.auth.sign_up(&email, &request.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "admin account created");
            setup_response(
                StatusCode::CREATED,
                email,
                Notice::success(
                    "Success",
                    "Admin account created successfully! Check your email to confirm the account.",
                ),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "admin setup failed");
            setup_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                email,
                Notice::error("Error", e.to_string()),
            )
        }
    };
    Ok(response)
}

fn setup_response(status: StatusCode, email: String, notice: Notice) -> Response {
    (
        status,
        Json(SetupView {
            email,
            message: Some(notice),
        }),
    )
        .into_response()
}
