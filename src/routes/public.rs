use crate::{AppState, handlers::public};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages. Nothing here needs a visitor session, and a backend
/// failure degrades to empty lists or a not-found view rather than an error.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe; answers without touching the backend.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Hero, latest podcasts and posts, and the next upcoming documentary.
        .route("/", get(public::home))
        .route("/about", get(public::about))
        .route("/contact", get(public::contact))
        .route("/podcasts", get(public::podcasts))
        // GET /podcasts/{id}
        // Unknown ids render the not-found view with a link back to the list.
        .route("/podcasts/{id}", get(public::podcast_detail))
        // GET /documentaries?tag=...
        .route("/documentaries", get(public::documentaries))
        // GET /blog?category=...&search=...
        .route("/blog", get(public::blog))
        .route("/blog/{id}", get(public::blog_post_detail))
}
