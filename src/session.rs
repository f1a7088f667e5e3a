//! Visitor sessions.
//!
//! Every browser gets one [`AuthSession`]: an observable container holding who
//! is signed in, fed by auth events and read by the admin guard. Sessions live
//! in a [`SessionRegistry`] keyed by the opaque `sid` cookie.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use moka::future::Cache;
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, watch};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthError, AuthProviderState, Session, SessionUser},
    config::Env,
    models::Notice,
};

pub const SESSION_COOKIE: &str = "sid";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// AuthState
///
/// Snapshot of a visitor's authentication. `loading` is true only while the
/// initial session check against the backend is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub loading: bool,
    pub user: Option<SessionUser>,
    pub session: Option<Session>,
}

/// AuthEvent
///
/// Session-change notifications. Applying one is the only way an
/// [`AuthSession`]'s state changes.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// Result of the initial session check.
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

/// AuthSession
///
/// Single source of truth for "who is logged in" for one visitor. Readers take
/// snapshots or subscribe to a `watch` channel and see every change as it is
/// applied.
pub struct AuthSession {
    id: Uuid,
    provider: AuthProviderState,
    state: watch::Sender<AuthState>,
    notices: Mutex<Vec<Notice>>,
    save_gate: Arc<AsyncMutex<()>>,
    /// Held while a token refresh is in flight. Refresh tokens are single-use.
    refresh_lock: AsyncMutex<()>,
}

impl AuthSession {
    /// A settled session with nobody signed in.
    pub fn new(id: Uuid, provider: AuthProviderState) -> Arc<Self> {
        Arc::new(Self::with_state(id, provider, AuthState::default()))
    }

    /// Starts in `loading` and checks `refresh_token` with the backend in the
    /// background. The outcome arrives as [`AuthEvent::InitialSession`].
    pub fn restore(id: Uuid, provider: AuthProviderState, refresh_token: String) -> Arc<Self> {
        let session = Arc::new(Self::with_state(
            id,
            provider,
            AuthState {
                loading: true,
                ..AuthState::default()
            },
        ));

        let task_session = Arc::clone(&session);
        tokio::spawn(async move {
            let restored = match task_session.provider.refresh_session(&refresh_token).await {
                Ok(restored) => Some(restored),
                Err(e) => {
                    tracing::debug!(session = %task_session.id, error = %e, "no session to restore");
                    None
                }
            };
            task_session.apply(AuthEvent::InitialSession(restored));
        });

        session
    }

    fn with_state(id: Uuid, provider: AuthProviderState, state: AuthState) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            id,
            provider,
            state,
            notices: Mutex::new(Vec::new()),
            save_gate: Arc::new(AsyncMutex::new(())),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.state.borrow().user.clone()
    }

    /// Current refresh token, if signed in.
    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.refresh_token.clone())
    }

    /// Folds one event into the state and notifies every subscriber.
    pub fn apply(&self, event: AuthEvent) {
        tracing::debug!(session = %self.id, event = event_name(&event), "auth state change");
        self.state.send_if_modified(|state| {
            match event {
                // A sign-in or sign-out that landed first wins over a late check.
                AuthEvent::InitialSession(_) if !state.loading => return false,
                AuthEvent::InitialSession(session) => {
                    state.user = session.as_ref().map(|s| s.user.clone());
                    state.session = session;
                }
                AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                    state.user = Some(session.user.clone());
                    state.session = Some(session);
                }
                AuthEvent::SignedOut => {
                    state.user = None;
                    state.session = None;
                }
            }
            state.loading = false;
            true
        });
    }

    /// Delegates to the backend. Navigation and notices are the caller's job.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        self.apply(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Ends the session locally no matter what the backend answers.
    pub async fn sign_out(&self) {
        let access_token = self
            .state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = access_token {
            if let Err(e) = self.provider.sign_out(&token).await {
                tracing::warn!(session = %self.id, error = %e, "backend sign-out failed");
            }
        }
        self.apply(AuthEvent::SignedOut);
    }

    /// Refreshes an expired access token, or signs the visitor out when the
    /// refresh is refused. A network failure leaves the state untouched.
    ///
    /// Concurrent callers share one refresh: whoever waits for the lock finds
    /// the rotated session and returns.
    pub async fn ensure_fresh(&self) {
        let Some(seen) = self.expired_refresh_token() else {
            return;
        };

        let _refreshing = self.refresh_lock.lock().await;
        let Some(refresh_token) = self.expired_refresh_token().filter(|t| *t == seen) else {
            return;
        };

        match self.provider.refresh_session(&refresh_token).await {
            Ok(session) => self.apply(AuthEvent::TokenRefreshed(session)),
            Err(AuthError::Network(e)) => {
                tracing::warn!(session = %self.id, error = %e, "token refresh unreachable");
            }
            Err(_) => self.apply(AuthEvent::SignedOut),
        }
    }

    /// Checks the current access token through the provider. A token it
    /// rejects (revoked, tampered or signed by another project) ends the
    /// session. Expiry is left to [`Self::ensure_fresh`], and an unreachable
    /// service changes nothing.
    pub async fn verify(&self) {
        let access_token = self
            .state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.access_token.clone());
        let Some(token) = access_token else {
            return;
        };

        match self.provider.get_user(&token).await {
            Ok(_) => {}
            Err(AuthError::InvalidToken) => {
                tracing::info!(session = %self.id, "access token rejected, signing out");
                self.apply(AuthEvent::SignedOut);
            }
            Err(e) => tracing::debug!(session = %self.id, error = %e, "access token not verified"),
        }
    }

    /// The refresh token to use when the current access token needs replacing.
    fn expired_refresh_token(&self) -> Option<String> {
        let state = self.state.borrow();
        state.session.as_ref().and_then(|s| {
            s.is_expired(Utc::now(), ChronoDuration::seconds(EXPIRY_LEEWAY_SECS))
                .then(|| s.refresh_token.clone())
        })
    }

    /// Waits until the initial check has finished, or `timeout` elapses, and
    /// returns the state at that point.
    pub async fn settled(&self, timeout: Duration) -> AuthState {
        let mut rx = self.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|state| !state.loading)).await {
            Ok(Ok(state)) => state.clone(),
            _ => self.snapshot(),
        }
    }

    // --- Notices ---

    pub fn push_notice(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    /// Returns and clears the queued notices.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    // --- Save gate ---

    /// Claims the gate for one save. `None` while another save from this
    /// visitor is still in flight.
    pub fn begin_save(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.save_gate).try_lock_owned().ok()
    }

    pub fn is_saving(&self) -> bool {
        self.save_gate.try_lock().is_err()
    }
}

fn event_name(event: &AuthEvent) -> &'static str {
    match event {
        AuthEvent::InitialSession(_) => "initial_session",
        AuthEvent::SignedIn(_) => "signed_in",
        AuthEvent::SignedOut => "signed_out",
        AuthEvent::TokenRefreshed(_) => "token_refreshed",
    }
}

/// SessionRegistry
///
/// All live visitor sessions, evicted after `idle` without a request.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<Uuid, Arc<AuthSession>>,
    provider: AuthProviderState,
}

impl SessionRegistry {
    pub fn new(provider: AuthProviderState, idle: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(idle)
                .build(),
            provider,
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<AuthSession>> {
        self.sessions.get(&id).await
    }

    /// Opens a session for a new visitor, restoring a previous sign-in when a
    /// refresh token is presented.
    pub async fn open(&self, refresh_token: Option<String>) -> Arc<AuthSession> {
        let id = Uuid::new_v4();
        let session = match refresh_token {
            Some(token) => AuthSession::restore(id, Arc::clone(&self.provider), token),
            None => AuthSession::new(id, Arc::clone(&self.provider)),
        };
        self.sessions.insert(id, Arc::clone(&session)).await;
        session
    }
}

/// attach_session
///
/// Middleware resolving the visitor's [`AuthSession`] from the `sid` cookie
/// (opening one when missing or expired) and storing it in the request
/// extensions. Afterwards it keeps the `sid` and refresh-token cookies in step
/// with the session.
pub async fn attach_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = match jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    let (session, opened) = match existing {
        Some(session) => (session, false),
        None => {
            let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
            (state.sessions.open(refresh).await, true)
        }
    };

    request.extensions_mut().insert(Arc::clone(&session));
    let response = next.run(request).await;

    let secure = state.config.env == Env::Production;
    let mut jar = jar;
    if opened {
        jar = jar.add(session_cookie(SESSION_COOKIE, session.id().to_string(), secure));
    }

    // The check may still be running; leave the cookie alone until it settles.
    if !session.snapshot().loading {
        let presented = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
        match (session.refresh_token(), presented) {
            (Some(current), Some(old)) if current == old => {}
            (Some(current), _) => {
                jar = jar.add(session_cookie(REFRESH_COOKIE, current, secure))
            }
            (None, Some(_)) => jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/")),
            (None, None) => {}
        }
    }

    (jar, response).into_response()
}

/// Both cookies are `HttpOnly` and `SameSite=Lax`; in production they are
/// also `Secure`.
pub fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// CurrentSession
///
/// Extractor for the visitor's session installed by [`attach_session`].
pub struct CurrentSession(pub Arc<AuthSession>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<AuthSession>>()
            .cloned()
            .map(CurrentSession)
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
