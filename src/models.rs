use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Persisted Records (Mapped to Database) ---

/// Entity
///
/// The four independent record kinds managed by the admin area. Each maps to one
/// table and is keyed by its own identifier; nothing references anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    BlogPost,
    Documentary,
    Podcast,
    HomepageContent,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::BlogPost => "blog_posts",
            Entity::Documentary => "documentaries",
            Entity::Podcast => "podcasts",
            Entity::HomepageContent => "homepage_content",
        }
    }

    /// Human label used in notices ("Podcast created").
    pub fn label(self) -> &'static str {
        match self {
            Entity::BlogPost => "Blog post",
            Entity::Documentary => "Documentary",
            Entity::Podcast => "Podcast",
            Entity::HomepageContent => "Homepage content",
        }
    }
}

/// BlogPost
///
/// A row of `public.blog_posts`. `date` is the publication date shown on the
/// site; the list views order by it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category: String,
    pub author: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Documentary
///
/// A row of `public.documentaries`. `release_date` and `duration` are free text
/// ("March 2025", "65 min").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Documentary {
    pub id: Uuid,
    pub title: String,
    pub director: String,
    pub duration: String,
    pub release_date: String,
    pub image_url: Option<String>,
    pub description: String,
    pub video_url: Option<String>,
    pub tags: Vec<String>,
    pub coming_soon: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Podcast
///
/// A row of `public.podcasts`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Podcast {
    pub id: Uuid,
    pub title: String,
    pub host: String,
    pub guest: Option<String>,
    pub duration: String,
    pub image_url: Option<String>,
    pub description: String,
    pub audio_url: Option<String>,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// HomepageContent
///
/// A row of `public.homepage_content`. The id is a fixed section key such as
/// `"hero"` rather than a generated UUID.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct HomepageContent {
    pub id: String,
    pub section_type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub learn_more_url: Option<String>,
    pub listen_now_url: Option<String>,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Mutation Payloads (what the admin forms submit) ---

/// BlogPostInput
///
/// Insert/update payload. `date` is submitted as text and cast by the store, so
/// a malformed value is rejected by the backend rather than by this service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BlogPostInput {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentaryInput {
    pub title: String,
    pub director: String,
    pub duration: String,
    pub release_date: String,
    pub image_url: Option<String>,
    pub description: String,
    pub video_url: Option<String>,
    pub tags: Vec<String>,
    pub coming_soon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PodcastInput {
    pub title: String,
    pub host: String,
    pub guest: Option<String>,
    pub duration: String,
    pub image_url: Option<String>,
    pub description: String,
    pub audio_url: Option<String>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HomepageContentInput {
    pub id: String,
    pub section_type: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub learn_more_url: Option<String>,
    pub listen_now_url: Option<String>,
    pub image_url: Option<String>,
}

// --- Notices (transient user-facing messages) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Notice
///
/// A one-shot message shown by the next rendered view, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}
