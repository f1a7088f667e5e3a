use crate::{
    AppState,
    guard::require_admin,
    handlers::{
        admin::{self, BlogAdmin, DocumentaryAdmin, PodcastAdmin},
        login,
    },
    session::attach_session,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

/// Admin Router Module
///
/// Nested under `/admin`. Layering, outermost first:
///
/// 1. `attach_session` resolves (or opens) the visitor's session for every
///    admin request, including the login page.
/// 2. `require_admin` guards everything except login, setup and logout. An
///    unauthenticated visitor is redirected to `/admin/login` with `303`.
/// 3. Guarded writes accept bodies sized for a cover image
///    (`AppConfig::admin_body_limit`) instead of axum's 2 MB default.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let guarded = Router::new()
        // GET /admin
        // Dashboard with the three record counts.
        .route("/", get(admin::dashboard))
        // GET /admin/podcasts?panel=create|edit|delete&id=...
        // POST creates from a multipart form.
        .route(
            "/podcasts",
            get(admin::list_page::<PodcastAdmin>).post(admin::create::<PodcastAdmin>),
        )
        .route("/podcasts/{id}", post(admin::update::<PodcastAdmin>))
        .route("/podcasts/{id}/delete", post(admin::delete::<PodcastAdmin>))
        .route(
            "/documentaries",
            get(admin::list_page::<DocumentaryAdmin>).post(admin::create::<DocumentaryAdmin>),
        )
        .route("/documentaries/{id}", post(admin::update::<DocumentaryAdmin>))
        .route(
            "/documentaries/{id}/delete",
            post(admin::delete::<DocumentaryAdmin>),
        )
        .route(
            "/blog",
            get(admin::list_page::<BlogAdmin>).post(admin::create::<BlogAdmin>),
        )
        .route("/blog/{id}", post(admin::update::<BlogAdmin>))
        .route("/blog/{id}/delete", post(admin::delete::<BlogAdmin>))
        // GET/POST /admin/homepage
        // Hero section editor; saving upserts the fixed "hero" row.
        .route(
            "/homepage",
            get(admin::homepage_editor).post(admin::save_homepage),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(DefaultBodyLimit::max(state.config.admin_body_limit()));

    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        // One-time admin bootstrap; 404 unless enabled in config.
        .route("/setup", get(login::setup_page).post(login::setup))
        .route("/logout", post(login::logout))
        .merge(guarded)
        .layer(middleware::from_fn_with_state(state, attach_session))
}
