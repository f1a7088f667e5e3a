use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Backend collaborators: relational store, auth service, object storage.
pub mod auth;
pub mod backend;
pub mod repository;
pub mod storage;

// Site core: configuration, records, cached reads, writes, visitor sessions.
pub mod config;
pub mod error;
pub mod forms;
pub mod guard;
pub mod models;
pub mod mutations;
pub mod query;
pub mod session;
pub mod views;

pub mod handlers;
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use backend::Backend;
pub use config::AppConfig;
pub use mutations::ContentMutations;
pub use query::{ContentQueries, QueryClient};
pub use session::SessionRegistry;

/// ApiDoc
///
/// OpenAPI document for the site's view models, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::public::home, handlers::public::about, handlers::public::contact,
        handlers::public::podcasts, handlers::public::podcast_detail,
        handlers::public::documentaries, handlers::public::blog,
        handlers::public::blog_post_detail,
        handlers::login::login_page, handlers::login::login, handlers::login::logout,
        handlers::login::setup_page, handlers::login::setup,
        handlers::admin::dashboard, handlers::admin::homepage_editor,
        handlers::admin::save_homepage,
        handlers::admin::list_page, handlers::admin::create, handlers::admin::update,
        handlers::admin::delete,
    ),
    components(
        schemas(
            models::BlogPost, models::Documentary, models::Podcast, models::HomepageContent,
            models::Notice, models::NoticeKind, auth::SessionUser,
            forms::BlogPostForm, forms::PodcastForm, forms::DocumentaryForm, forms::HeroForm,
            views::HomeView, views::AboutView, views::ContactView, views::PageSection,
            views::PodcastsView, views::DocumentariesView, views::BlogView, views::NotFoundView,
            views::LoginView, views::SetupView, views::DashboardView, views::HomepageEditorView,
            handlers::login::LoginRequest, handlers::login::SetupRequest,
        )
    ),
    tags(
        (name = "sister-stories", description = "Sister Stories content site")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, shared by every handler. All members are
/// cheap handles: cloning the state clones `Arc`s and cache handles, never data.
#[derive(Clone)]
pub struct AppState {
    /// Cached reads.
    pub queries: ContentQueries,
    /// Writes, each followed by cache invalidation.
    pub mutations: ContentMutations,
    pub auth: auth::AuthProviderState,
    /// Per-visitor auth sessions, keyed by the `sid` cookie.
    pub sessions: SessionRegistry,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the backend handles into one query cache shared by reads and writes.
    pub fn new(backend: Backend, config: AppConfig) -> Self {
        let client = QueryClient::new(config.query_stale_time());
        Self {
            queries: ContentQueries::new(backend.repo.clone(), client.clone()),
            mutations: ContentMutations::new(backend.repo, backend.storage, client),
            sessions: SessionRegistry::new(backend.auth.clone(), config.session_idle_time()),
            auth: backend.auth,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ContentQueries {
    fn from_ref(app_state: &AppState) -> ContentQueries {
        app_state.queries.clone()
    }
}

impl FromRef<AppState> for ContentMutations {
    fn from_ref(app_state: &AppState) -> ContentMutations {
        app_state.mutations.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles public and admin routers, the catch-all not-found view, and the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/admin", admin::admin_routes(state.clone()))
        .fallback(handlers::public::not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request carrying method, URI and the `x-request-id`, so every
/// log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
