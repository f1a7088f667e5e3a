use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderName, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::{AppState, auth::SessionUser, session::AuthState, session::CurrentSession};

pub const LOGIN_PATH: &str = "/admin/login";

/// GuardState
///
/// What the admin guard makes of a visitor's `AuthState`.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// The initial session check is still in flight.
    Checking,
    Authenticated(SessionUser),
    Unauthenticated,
}

impl From<&AuthState> for GuardState {
    fn from(state: &AuthState) -> Self {
        match (&state.user, state.loading) {
            (_, true) => GuardState::Checking,
            (Some(user), false) => GuardState::Authenticated(user.clone()),
            (None, false) => GuardState::Unauthenticated,
        }
    }
}

/// require_admin
///
/// Route layer for the admin area. Re-evaluated on every request, so a sign-in
/// or sign-out elsewhere takes effect on the next navigation. The access token
/// is refreshed when close to expiry and then verified.
///
/// - `Checking`: neutral loading body that asks the browser to retry, no redirect.
/// - `Unauthenticated`: `303 See Other` to the login page. The browser replaces
///   the guarded URL, so it never lands in history.
/// - `Authenticated`: the handler runs with the user in the request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    mut request: Request,
    next: Next,
) -> Response {
    session
        .settled(state.config.session_check_timeout())
        .await;
    session.ensure_fresh().await;
    session.verify().await;

    match GuardState::from(&session.snapshot()) {
        GuardState::Checking => checking_response(),
        GuardState::Unauthenticated => {
            tracing::debug!(path = %request.uri().path(), "guard: redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        GuardState::Authenticated(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
    }
}

fn checking_response() -> Response {
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (HeaderName::from_static("refresh"), HeaderValue::from_static("1")),
        ],
        Json(json!({ "state": "checking" })),
    )
        .into_response()
}

/// AdminUser
///
/// The signed-in admin, as placed in the request extensions by
/// [`require_admin`]. Outside the guarded tree the extractor redirects to the
/// login page.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .map(AdminUser)
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}
