use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    forms::{HERO_SECTION_ID, HeroForm},
    models::{BlogPost, Documentary, Podcast},
    query::ContentQueries,
    views::{
        AboutView, BlogView, ContactView, DocumentariesView, HomeView, NotFoundView, PageSection,
        PodcastsView,
    },
};

const RECENT_ON_HOME: i64 = 3;

/// home
///
/// [Public Route] Hero copy (stored or default), the three latest podcasts and
/// posts, and the first upcoming documentary. The four reads run concurrently.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page", body = HomeView))
)]
pub async fn home(State(queries): State<ContentQueries>) -> Json<HomeView> {
    let (hero, recent_podcasts, documentaries, recent_posts) = tokio::join!(
        queries.homepage_section(HERO_SECTION_ID),
        queries.recent_podcasts(RECENT_ON_HOME),
        queries.documentaries(),
        queries.recent_blog_posts(RECENT_ON_HOME),
    );

    Json(HomeView {
        hero: hero.as_ref().map(HeroForm::from_record).unwrap_or_default(),
        recent_podcasts,
        featured_documentary: documentaries.into_iter().find(|d| d.coming_soon),
        recent_posts,
    })
}

#[utoipa::path(
    get,
    path = "/about",
    responses((status = 200, description = "About page", body = AboutView))
)]
pub async fn about() -> Json<AboutView> {
    Json(AboutView {
        title: "About Sister Stories".to_string(),
        sections: vec![
            PageSection {
                title: "Our Story".to_string(),
                body: "The journey of Sister Stories from idea to reality.".to_string(),
            },
            PageSection {
                title: "Meet Our Team".to_string(),
                body: "The passionate individuals behind Sister Stories.".to_string(),
            },
        ],
    })
}

#[utoipa::path(
    get,
    path = "/contact",
    responses((status = 200, description = "Contact page", body = ContactView))
)]
pub async fn contact() -> Json<ContactView> {
    Json(ContactView {
        title: "Contact Us".to_string(),
        address: vec![
            "123 Empowerment Street".to_string(),
            "San Francisco, CA 94103".to_string(),
            "United States".to_string(),
        ],
        emails: vec![
            "General Inquiries: info@sisterstories.org".to_string(),
            "Content Submissions: content@sisterstories.org".to_string(),
            "Partnerships: partners@sisterstories.org".to_string(),
        ],
        phones: vec![
            "Main Office: (555) 123-4567".to_string(),
            "Media Inquiries: (555) 765-4321".to_string(),
        ],
        office_hours: vec![
            "Monday - Friday: 9:00 AM - 5:00 PM".to_string(),
            "Saturday & Sunday: Closed".to_string(),
        ],
    })
}

// --- Podcasts ---

#[utoipa::path(
    get,
    path = "/podcasts",
    responses((status = 200, description = "All podcasts, newest first", body = PodcastsView))
)]
pub async fn podcasts(State(queries): State<ContentQueries>) -> Json<PodcastsView> {
    Json(PodcastsView {
        podcasts: queries.podcasts().await,
    })
}

/// podcast_detail
///
/// [Public Route] A missing or malformed id renders the not-found view.
#[utoipa::path(
    get,
    path = "/podcasts/{id}",
    responses(
        (status = 200, description = "Podcast", body = Podcast),
        (status = 404, description = "Not Found", body = NotFoundView)
    )
)]
pub async fn podcast_detail(
    State(queries): State<ContentQueries>,
    Path(id): Path<String>,
) -> Result<Json<Podcast>> {
    let not_found = || AppError::NotFound(NotFoundView::record("Podcast", "/podcasts"));
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    queries.podcast(id).await.map(Json).ok_or_else(not_found)
}

// --- Documentaries ---

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DocumentaryFilter {
    /// Only documentaries carrying this tag.
    pub tag: Option<String>,
}

/// documentaries
///
/// [Public Route] Upcoming and released documentaries, optionally narrowed to
/// one tag. `all_tags` is computed before filtering so the tag bar stays whole.
#[utoipa::path(
    get,
    path = "/documentaries",
    params(DocumentaryFilter),
    responses((status = 200, description = "Documentaries", body = DocumentariesView))
)]
pub async fn documentaries(
    State(queries): State<ContentQueries>,
    Query(filter): Query<DocumentaryFilter>,
) -> Json<DocumentariesView> {
    let all = queries.documentaries().await;

    let mut all_tags: Vec<String> = all.iter().flat_map(|d| d.tags.iter().cloned()).collect();
    all_tags.sort();
    all_tags.dedup();

    let selected_tag = filter.tag.filter(|t| !t.is_empty());
    let (coming_soon, released): (Vec<Documentary>, Vec<Documentary>) = all
        .into_iter()
        .filter(|d| selected_tag.as_ref().is_none_or(|tag| d.tags.contains(tag)))
        .partition(|d| d.coming_soon);

    Json(DocumentariesView {
        coming_soon,
        released,
        all_tags,
        selected_tag,
    })
}

// --- Blog ---

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BlogFilter {
    pub category: Option<String>,
    /// Case-insensitive match against title and excerpt.
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/blog",
    params(BlogFilter),
    responses((status = 200, description = "Blog posts, newest first", body = BlogView))
)]
pub async fn blog(
    State(queries): State<ContentQueries>,
    Query(filter): Query<BlogFilter>,
) -> Json<BlogView> {
    let all = queries.blog_posts().await;

    let mut categories: Vec<String> = all.iter().map(|p| p.category.clone()).collect();
    categories.sort();
    categories.dedup();

    let selected_category = filter.category.filter(|c| !c.is_empty());
    let search = filter.search.filter(|s| !s.trim().is_empty());
    let needle = search.as_deref().map(|s| s.trim().to_lowercase());

    let posts = all
        .into_iter()
        .filter(|p| selected_category.as_ref().is_none_or(|c| &p.category == c))
        .filter(|p| {
            needle.as_ref().is_none_or(|n| {
                p.title.to_lowercase().contains(n) || p.excerpt.to_lowercase().contains(n)
            })
        })
        .collect();

    Json(BlogView {
        posts,
        categories,
        selected_category,
        search,
    })
}

#[utoipa::path(
    get,
    path = "/blog/{id}",
    responses(
        (status = 200, description = "Blog post", body = BlogPost),
        (status = 404, description = "Not Found", body = NotFoundView)
    )
)]
pub async fn blog_post_detail(
    State(queries): State<ContentQueries>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>> {
    let not_found = || AppError::NotFound(NotFoundView::record("Blog post", "/blog"));
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    queries.blog_post(id).await.map(Json).ok_or_else(not_found)
}

/// not_found
///
/// Catch-all for unknown paths.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "no route");
    (StatusCode::NOT_FOUND, Json(NotFoundView::page()))
}
