use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;

/// AuthError
///
/// Structured failures of the hosted auth service, mapped from its error bodies.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    #[error("Session expired")]
    SessionExpired,
    #[error("Invalid access token")]
    InvalidToken,
    #[error("Network error: {0}")]
    Network(String),
    #[error("{0}")]
    Backend(String),
}

/// Claims
///
/// Payload of a Supabase access token. Signed with the project's JWT secret and
/// verified locally on every session lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth.users id.
    pub sub: Uuid,
    pub email: Option<String>,
    pub exp: usize,
    pub aud: String,
}

/// SessionUser
///
/// The identity of the signed-in admin as exposed to the rest of the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// Session
///
/// Tokens issued by the auth service for one signed-in user.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    /// True once the access token is expired or within `leeway` of expiring.
    pub fn is_expired(&self, now: DateTime<Utc>, leeway: ChronoDuration) -> bool {
        self.expires_at <= now + leeway
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// AuthProvider
///
/// Contract for the hosted auth service: email/password accounts, token
/// refresh, session lookup and sign-out. Handlers never call it directly; they
/// go through the visitor's `AuthSession`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers an account. The returned user usually still has to confirm
    /// their email before they can sign in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, AuthError>;
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;
    /// Resolves the user an access token belongs to.
    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

pub type AuthProviderState = Arc<dyn AuthProvider>;

// --- Supabase Auth (GoTrue) over HTTP ---

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
}

/// Error bodies come in two generations: `{error_code, msg}` and
/// `{error, error_description}`.
#[derive(Deserialize, Default)]
struct ErrorResponse {
    error_code: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ErrorResponse {
    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Authentication error".to_string())
    }

    fn into_auth_error(self) -> AuthError {
        let code = self
            .error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default();
        let message = self.message();
        match code {
            "email_not_confirmed" => AuthError::EmailNotConfirmed,
            "invalid_credentials" | "invalid_grant" if message.contains("not confirmed") => {
                AuthError::EmailNotConfirmed
            }
            "invalid_credentials" | "invalid_grant" => AuthError::InvalidCredentials,
            _ if message.contains("Email not confirmed") => AuthError::EmailNotConfirmed,
            _ if message.contains("Invalid login credentials") => AuthError::InvalidCredentials,
            _ => AuthError::Backend(message),
        }
    }
}

/// SupabaseAuthClient
///
/// `AuthProvider` talking to the project's `/auth/v1` endpoints with the anon
/// key. Access tokens are verified locally with the project's JWT secret.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    jwt_secret: String,
}

impl SupabaseAuthClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", config.supabase_url.trim_end_matches('/')),
            anon_key: config.supabase_anon_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(format!("{}/token?grant_type={}", self.base_url, grant_type))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<ErrorResponse>().await.unwrap_or_default();
            return Err(body.into_auth_error());
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let expires_at = token
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| Utc::now() + ChronoDuration::seconds(token.expires_in.unwrap_or(3600)));

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: SessionUser {
                id: token.user.id,
                email: token.user.email.unwrap_or_default(),
            },
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let response = self
            .client
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<ErrorResponse>().await.unwrap_or_default();
            return Err(AuthError::Backend(body.message()));
        }

        // With confirmations enabled the body is the bare user; otherwise it is
        // a full token response wrapping it.
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        let user = body.get("user").cloned().unwrap_or(body);
        let user: UserResponse =
            serde_json::from_value(user).map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(SessionUser {
            id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_request(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
        .map_err(|e| match e {
            AuthError::Network(_) => e,
            _ => AuthError::SessionExpired,
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError> {
        let key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&["authenticated"]);

        let data = decode::<Claims>(access_token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::SessionExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(SessionUser {
            id: data.claims.sub,
            email: data.claims.email.unwrap_or_default(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let body = response.json::<ErrorResponse>().await.unwrap_or_default();
            Err(AuthError::Backend(body.message()))
        }
    }
}

// --- Mock provider (for tests) ---

struct MockAccount {
    id: Uuid,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct MockTokens {
    access: HashMap<String, (SessionUser, DateTime<Utc>)>,
    refresh: HashMap<String, SessionUser>,
}

/// MockAuthProvider
///
/// In-memory `AuthProvider` with the same failure modes as the hosted service:
/// bad credentials, unconfirmed accounts, network outages, slow refreshes and
/// failing sign-outs can all be simulated.
pub struct MockAuthProvider {
    accounts: Mutex<HashMap<String, MockAccount>>,
    tokens: Mutex<MockTokens>,
    token_ttl: Mutex<ChronoDuration>,
    refresh_delay: Mutex<Duration>,
    offline: AtomicBool,
    sign_out_fails: AtomicBool,
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            tokens: Mutex::new(MockTokens::default()),
            token_ttl: Mutex::new(ChronoDuration::hours(1)),
            refresh_delay: Mutex::new(Duration::ZERO),
            offline: AtomicBool::new(false),
            sign_out_fails: AtomicBool::new(false),
        }
    }
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a confirmed account.
    pub fn with_user(self, email: &str, password: &str) -> Self {
        self.insert_account(email, password, true);
        self
    }

    /// Adds an account that has not confirmed its email yet.
    pub fn with_unconfirmed_user(self, email: &str, password: &str) -> Self {
        self.insert_account(email, password, false);
        self
    }

    pub fn set_token_ttl(&self, ttl: ChronoDuration) {
        *self.token_ttl.lock().unwrap_or_else(PoisonError::into_inner) = ttl;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_sign_out_fails(&self, fails: bool) {
        self.sign_out_fails.store(fails, Ordering::SeqCst);
    }

    /// Marks an account's email as confirmed.
    pub fn confirm(&self, email: &str) {
        if let Some(account) = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(email)
        {
            account.confirmed = true;
        }
    }

    /// Revokes every token issued to `email`, as a sign-out on another device
    /// with global scope would.
    pub fn revoke_all(&self, email: &str) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.access.retain(|_, (user, _)| user.email != email);
        tokens.refresh.retain(|_, user| user.email != email);
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(email)
    }

    fn insert_account(&self, email: &str, password: &str, confirmed: bool) {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.to_string(),
                MockAccount {
                    id: Uuid::new_v4(),
                    password: password.to_string(),
                    confirmed,
                },
            );
    }

    fn online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn issue(&self, user: SessionUser) -> Session {
        let ttl = *self.token_ttl.lock().unwrap_or_else(PoisonError::into_inner);
        let session = Session {
            access_token: format!("mock-access-{}", Uuid::new_v4()),
            refresh_token: format!("mock-refresh-{}", Uuid::new_v4()),
            expires_at: Utc::now() + ttl,
            user,
        };
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.access.insert(
            session.access_token.clone(),
            (session.user.clone(), session.expires_at),
        );
        tokens
            .refresh
            .insert(session.refresh_token.clone(), session.user.clone());
        session
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        self.online()?;
        if self.has_account(email) {
            return Err(AuthError::Backend("User already registered".to_string()));
        }
        self.insert_account(email, password, false);
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let id = accounts.get(email).map(|a| a.id).unwrap_or_default();
        Ok(SessionUser {
            id,
            email: email.to_string(),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.online()?;
        let user = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts
                .get(email)
                .filter(|a| a.password == password)
                .ok_or(AuthError::InvalidCredentials)?;
            if !account.confirmed {
                return Err(AuthError::EmailNotConfirmed);
            }
            SessionUser {
                id: account.id,
                email: email.to_string(),
            }
        };
        Ok(self.issue(user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let delay = *self.refresh_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.online()?;
        // Refresh tokens are single-use, like the hosted service's rotation.
        let user = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .remove(refresh_token)
            .ok_or(AuthError::SessionExpired)?;
        Ok(self.issue(user))
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError> {
        self.online()?;
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        match tokens.access.get(access_token) {
            Some((_, expires_at)) if *expires_at <= Utc::now() => Err(AuthError::SessionExpired),
            Some((user, _)) => Ok(user.clone()),
            None => Err(AuthError::InvalidToken),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.online()?;
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Backend("sign-out rejected".to_string()));
        }
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((user, _)) = tokens.access.remove(access_token) {
            tokens.refresh.retain(|_, owner| *owner != user);
        }
        Ok(())
    }
}
