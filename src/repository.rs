use crate::models::{
    BlogPost, BlogPostInput, Documentary, DocumentaryInput, Entity, HomepageContent,
    HomepageContentInput, Podcast, PodcastInput,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Failures of the hosted relational store. Reads degrade these to empty
/// results; writes surface them to the admin as notices.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The store refused the row (constraint or type violation).
    #[error("rejected by the store: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// Contract for the four content tables. Every call is a single request to the
/// backend; nothing spans more than one table.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Blog posts (ordered by date, newest first) ---
    async fn list_blog_posts(&self, limit: Option<i64>) -> Result<Vec<BlogPost>, RepositoryError>;
    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, RepositoryError>;
    async fn count_blog_posts(&self) -> Result<i64, RepositoryError>;
    async fn insert_blog_post(&self, input: BlogPostInput) -> Result<BlogPost, RepositoryError>;
    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<BlogPost>, RepositoryError>;
    async fn delete_blog_post(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Documentaries (ordered by creation, newest first) ---
    async fn list_documentaries(&self) -> Result<Vec<Documentary>, RepositoryError>;
    async fn get_documentary(&self, id: Uuid) -> Result<Option<Documentary>, RepositoryError>;
    async fn count_documentaries(&self) -> Result<i64, RepositoryError>;
    async fn insert_documentary(
        &self,
        input: DocumentaryInput,
    ) -> Result<Documentary, RepositoryError>;
    async fn update_documentary(
        &self,
        id: Uuid,
        input: DocumentaryInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Documentary>, RepositoryError>;
    async fn delete_documentary(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Podcasts (ordered by date, newest first) ---
    async fn list_podcasts(&self, limit: Option<i64>) -> Result<Vec<Podcast>, RepositoryError>;
    async fn get_podcast(&self, id: Uuid) -> Result<Option<Podcast>, RepositoryError>;
    async fn count_podcasts(&self) -> Result<i64, RepositoryError>;
    async fn insert_podcast(&self, input: PodcastInput) -> Result<Podcast, RepositoryError>;
    async fn update_podcast(
        &self,
        id: Uuid,
        input: PodcastInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Podcast>, RepositoryError>;
    async fn delete_podcast(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- Homepage sections (keyed by fixed id) ---
    async fn get_homepage_section(
        &self,
        id: &str,
    ) -> Result<Option<HomepageContent>, RepositoryError>;
    async fn upsert_homepage_section(
        &self,
        input: HomepageContentInput,
        updated_at: DateTime<Utc>,
    ) -> Result<HomepageContent, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const BLOG_POST_COLUMNS: &str =
    "id, title, excerpt, content, image_url, category, author, date, created_at, updated_at";
const DOCUMENTARY_COLUMNS: &str = "id, title, director, duration, release_date, image_url, \
     description, video_url, tags, coming_soon, created_at, updated_at";
const PODCAST_COLUMNS: &str = "id, title, host, guest, duration, image_url, description, \
     audio_url, date, created_at, updated_at";
const HOMEPAGE_COLUMNS: &str = "id, section_type, title, subtitle, learn_more_url, \
     listen_now_url, image_url, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database. Queries are built at
/// runtime; `LIMIT NULL` means "no limit" in Postgres, so optional limits bind
/// straight through.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, entity: Entity) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", entity.table());
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?)
    }

    async fn delete(&self, entity: Entity, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", entity.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Postgres reports bad input (e.g. an unparseable timestamp) and NOT NULL
/// violations as database errors; those are the admin's to fix, not outages.
fn classify(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // 22xxx data exceptions, 23xxx integrity violations.
            Some(code) if code.starts_with("22") || code.starts_with("23") => {
                RepositoryError::Rejected(db.message().to_string())
            }
            _ => RepositoryError::Database(err),
        },
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_blog_posts(&self, limit: Option<i64>) -> Result<Vec<BlogPost>, RepositoryError> {
        let sql = format!("SELECT {BLOG_POST_COLUMNS} FROM blog_posts ORDER BY date DESC LIMIT $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, RepositoryError> {
        let sql = format!("SELECT {BLOG_POST_COLUMNS} FROM blog_posts WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_blog_posts(&self) -> Result<i64, RepositoryError> {
        self.count(Entity::BlogPost).await
    }

    async fn insert_blog_post(&self, input: BlogPostInput) -> Result<BlogPost, RepositoryError> {
        let sql = format!(
            "INSERT INTO blog_posts (title, excerpt, content, image_url, category, author, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::timestamptz) RETURNING {BLOG_POST_COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(input.title)
            .bind(input.excerpt)
            .bind(input.content)
            .bind(input.image_url)
            .bind(input.category)
            .bind(input.author)
            .bind(input.date)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<BlogPost>, RepositoryError> {
        let sql = format!(
            "UPDATE blog_posts SET title = $2, excerpt = $3, content = $4, image_url = $5, \
             category = $6, author = $7, date = $8::timestamptz, updated_at = $9 \
             WHERE id = $1 RETURNING {BLOG_POST_COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.excerpt)
            .bind(input.content)
            .bind(input.image_url)
            .bind(input.category)
            .bind(input.author)
            .bind(input.date)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn delete_blog_post(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete(Entity::BlogPost, id).await
    }

    async fn list_documentaries(&self) -> Result<Vec<Documentary>, RepositoryError> {
        let sql =
            format!("SELECT {DOCUMENTARY_COLUMNS} FROM documentaries ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Documentary>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_documentary(&self, id: Uuid) -> Result<Option<Documentary>, RepositoryError> {
        let sql = format!("SELECT {DOCUMENTARY_COLUMNS} FROM documentaries WHERE id = $1");
        Ok(sqlx::query_as::<_, Documentary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_documentaries(&self) -> Result<i64, RepositoryError> {
        self.count(Entity::Documentary).await
    }

    async fn insert_documentary(
        &self,
        input: DocumentaryInput,
    ) -> Result<Documentary, RepositoryError> {
        let sql = format!(
            "INSERT INTO documentaries (title, director, duration, release_date, image_url, \
             description, video_url, tags, coming_soon) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {DOCUMENTARY_COLUMNS}"
        );
        sqlx::query_as::<_, Documentary>(&sql)
            .bind(input.title)
            .bind(input.director)
            .bind(input.duration)
            .bind(input.release_date)
            .bind(input.image_url)
            .bind(input.description)
            .bind(input.video_url)
            .bind(input.tags)
            .bind(input.coming_soon)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update_documentary(
        &self,
        id: Uuid,
        input: DocumentaryInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Documentary>, RepositoryError> {
        let sql = format!(
            "UPDATE documentaries SET title = $2, director = $3, duration = $4, \
             release_date = $5, image_url = $6, description = $7, video_url = $8, tags = $9, \
             coming_soon = $10, updated_at = $11 WHERE id = $1 RETURNING {DOCUMENTARY_COLUMNS}"
        );
        sqlx::query_as::<_, Documentary>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.director)
            .bind(input.duration)
            .bind(input.release_date)
            .bind(input.image_url)
            .bind(input.description)
            .bind(input.video_url)
            .bind(input.tags)
            .bind(input.coming_soon)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn delete_documentary(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete(Entity::Documentary, id).await
    }

    async fn list_podcasts(&self, limit: Option<i64>) -> Result<Vec<Podcast>, RepositoryError> {
        let sql = format!("SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY date DESC LIMIT $1");
        Ok(sqlx::query_as::<_, Podcast>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_podcast(&self, id: Uuid) -> Result<Option<Podcast>, RepositoryError> {
        let sql = format!("SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = $1");
        Ok(sqlx::query_as::<_, Podcast>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_podcasts(&self) -> Result<i64, RepositoryError> {
        self.count(Entity::Podcast).await
    }

    async fn insert_podcast(&self, input: PodcastInput) -> Result<Podcast, RepositoryError> {
        let sql = format!(
            "INSERT INTO podcasts (title, host, guest, duration, image_url, description, \
             audio_url, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8::timestamptz) \
             RETURNING {PODCAST_COLUMNS}"
        );
        sqlx::query_as::<_, Podcast>(&sql)
            .bind(input.title)
            .bind(input.host)
            .bind(input.guest)
            .bind(input.duration)
            .bind(input.image_url)
            .bind(input.description)
            .bind(input.audio_url)
            .bind(input.date)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update_podcast(
        &self,
        id: Uuid,
        input: PodcastInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Podcast>, RepositoryError> {
        let sql = format!(
            "UPDATE podcasts SET title = $2, host = $3, guest = $4, duration = $5, \
             image_url = $6, description = $7, audio_url = $8, date = $9::timestamptz, \
             updated_at = $10 WHERE id = $1 RETURNING {PODCAST_COLUMNS}"
        );
        sqlx::query_as::<_, Podcast>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.host)
            .bind(input.guest)
            .bind(input.duration)
            .bind(input.image_url)
            .bind(input.description)
            .bind(input.audio_url)
            .bind(input.date)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn delete_podcast(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete(Entity::Podcast, id).await
    }

    async fn get_homepage_section(
        &self,
        id: &str,
    ) -> Result<Option<HomepageContent>, RepositoryError> {
        let sql = format!("SELECT {HOMEPAGE_COLUMNS} FROM homepage_content WHERE id = $1");
        Ok(sqlx::query_as::<_, HomepageContent>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_homepage_section(
        &self,
        input: HomepageContentInput,
        updated_at: DateTime<Utc>,
    ) -> Result<HomepageContent, RepositoryError> {
        let sql = format!(
            "INSERT INTO homepage_content (id, section_type, title, subtitle, learn_more_url, \
             listen_now_url, image_url, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET section_type = EXCLUDED.section_type, \
             title = EXCLUDED.title, subtitle = EXCLUDED.subtitle, \
             learn_more_url = EXCLUDED.learn_more_url, listen_now_url = EXCLUDED.listen_now_url, \
             image_url = EXCLUDED.image_url, updated_at = EXCLUDED.updated_at \
             RETURNING {HOMEPAGE_COLUMNS}"
        );
        sqlx::query_as::<_, HomepageContent>(&sql)
            .bind(input.id)
            .bind(input.section_type)
            .bind(input.title)
            .bind(input.subtitle)
            .bind(input.learn_more_url)
            .bind(input.listen_now_url)
            .bind(input.image_url)
            .bind(updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }
}

// --- In-process implementation ---

#[derive(Default)]
struct Tables {
    blog_posts: Vec<BlogPost>,
    documentaries: Vec<Documentary>,
    podcasts: Vec<Podcast>,
    homepage: Vec<HomepageContent>,
}

/// MemoryRepository
///
/// `Repository` held in process memory. Used by the test suite in place of the
/// hosted database; `set_failing(true)` makes every call fail like an outage,
/// and `read_calls()` counts round trips so caching can be observed.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of read requests served so far.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "simulated backend outage".to_string(),
            ));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, RepositoryError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&tables))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

/// Accepts what Postgres accepts for the common cases: RFC 3339 timestamps and
/// bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            RepositoryError::Rejected(format!(
                "invalid input syntax for type timestamp with time zone: \"{value}\""
            ))
        })
}

/// Newest-first by `key`; among equal keys the later insert wins.
fn newest_first<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K, limit: Option<i64>) -> Vec<T> {
    let mut sorted: Vec<T> = rows.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    match limit {
        Some(n) => sorted.into_iter().take(usize::try_from(n).unwrap_or(0)).collect(),
        None => sorted,
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_blog_posts(&self, limit: Option<i64>) -> Result<Vec<BlogPost>, RepositoryError> {
        self.read(|t| newest_first(&t.blog_posts, |p| p.date, limit))
    }

    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, RepositoryError> {
        self.read(|t| t.blog_posts.iter().find(|p| p.id == id).cloned())
    }

    async fn count_blog_posts(&self) -> Result<i64, RepositoryError> {
        self.read(|t| t.blog_posts.len() as i64)
    }

    async fn insert_blog_post(&self, input: BlogPostInput) -> Result<BlogPost, RepositoryError> {
        let date = parse_timestamp(&input.date)?;
        self.write(|t| {
            let now = Utc::now();
            let post = BlogPost {
                id: Uuid::new_v4(),
                title: input.title,
                excerpt: input.excerpt,
                content: input.content,
                image_url: input.image_url,
                category: input.category,
                author: input.author,
                date,
                created_at: now,
                updated_at: now,
            };
            t.blog_posts.push(post.clone());
            Ok(post)
        })
    }

    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<BlogPost>, RepositoryError> {
        let date = parse_timestamp(&input.date)?;
        self.write(|t| {
            Ok(t.blog_posts.iter_mut().find(|p| p.id == id).map(|post| {
                post.title = input.title;
                post.excerpt = input.excerpt;
                post.content = input.content;
                post.image_url = input.image_url;
                post.category = input.category;
                post.author = input.author;
                post.date = date;
                post.updated_at = updated_at;
                post.clone()
            }))
        })
    }

    async fn delete_blog_post(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.write(|t| {
            let before = t.blog_posts.len();
            t.blog_posts.retain(|p| p.id != id);
            Ok(t.blog_posts.len() < before)
        })
    }

    async fn list_documentaries(&self) -> Result<Vec<Documentary>, RepositoryError> {
        self.read(|t| newest_first(&t.documentaries, |d| d.created_at, None))
    }

    async fn get_documentary(&self, id: Uuid) -> Result<Option<Documentary>, RepositoryError> {
        self.read(|t| t.documentaries.iter().find(|d| d.id == id).cloned())
    }

    async fn count_documentaries(&self) -> Result<i64, RepositoryError> {
        self.read(|t| t.documentaries.len() as i64)
    }

    async fn insert_documentary(
        &self,
        input: DocumentaryInput,
    ) -> Result<Documentary, RepositoryError> {
        self.write(|t| {
            let now = Utc::now();
            let documentary = Documentary {
                id: Uuid::new_v4(),
                title: input.title,
                director: input.director,
                duration: input.duration,
                release_date: input.release_date,
                image_url: input.image_url,
                description: input.description,
                video_url: input.video_url,
                tags: input.tags,
                coming_soon: input.coming_soon,
                created_at: now,
                updated_at: now,
            };
            t.documentaries.push(documentary.clone());
            Ok(documentary)
        })
    }

    async fn update_documentary(
        &self,
        id: Uuid,
        input: DocumentaryInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Documentary>, RepositoryError> {
        self.write(|t| {
            Ok(t.documentaries.iter_mut().find(|d| d.id == id).map(|doc| {
                doc.title = input.title;
                doc.director = input.director;
                doc.duration = input.duration;
                doc.release_date = input.release_date;
                doc.image_url = input.image_url;
                doc.description = input.description;
                doc.video_url = input.video_url;
                doc.tags = input.tags;
                doc.coming_soon = input.coming_soon;
                doc.updated_at = updated_at;
                doc.clone()
            }))
        })
    }

    async fn delete_documentary(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.write(|t| {
            let before = t.documentaries.len();
            t.documentaries.retain(|d| d.id != id);
            Ok(t.documentaries.len() < before)
        })
    }

    async fn list_podcasts(&self, limit: Option<i64>) -> Result<Vec<Podcast>, RepositoryError> {
        self.read(|t| newest_first(&t.podcasts, |p| p.date, limit))
    }

    async fn get_podcast(&self, id: Uuid) -> Result<Option<Podcast>, RepositoryError> {
        self.read(|t| t.podcasts.iter().find(|p| p.id == id).cloned())
    }

    async fn count_podcasts(&self) -> Result<i64, RepositoryError> {
        self.read(|t| t.podcasts.len() as i64)
    }

    async fn insert_podcast(&self, input: PodcastInput) -> Result<Podcast, RepositoryError> {
        let date = parse_timestamp(&input.date)?;
        self.write(|t| {
            let now = Utc::now();
            let podcast = Podcast {
                id: Uuid::new_v4(),
                title: input.title,
                host: input.host,
                guest: input.guest,
                duration: input.duration,
                image_url: input.image_url,
                description: input.description,
                audio_url: input.audio_url,
                date,
                created_at: now,
                updated_at: now,
            };
            t.podcasts.push(podcast.clone());
            Ok(podcast)
        })
    }

    async fn update_podcast(
        &self,
        id: Uuid,
        input: PodcastInput,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Podcast>, RepositoryError> {
        let date = parse_timestamp(&input.date)?;
        self.write(|t| {
            Ok(t.podcasts.iter_mut().find(|p| p.id == id).map(|podcast| {
                podcast.title = input.title;
                podcast.host = input.host;
                podcast.guest = input.guest;
                podcast.duration = input.duration;
                podcast.image_url = input.image_url;
                podcast.description = input.description;
                podcast.audio_url = input.audio_url;
                podcast.date = date;
                podcast.updated_at = updated_at;
                podcast.clone()
            }))
        })
    }

    async fn delete_podcast(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.write(|t| {
            let before = t.podcasts.len();
            t.podcasts.retain(|p| p.id != id);
            Ok(t.podcasts.len() < before)
        })
    }

    async fn get_homepage_section(
        &self,
        id: &str,
    ) -> Result<Option<HomepageContent>, RepositoryError> {
        self.read(|t| t.homepage.iter().find(|s| s.id == id).cloned())
    }

    async fn upsert_homepage_section(
        &self,
        input: HomepageContentInput,
        updated_at: DateTime<Utc>,
    ) -> Result<HomepageContent, RepositoryError> {
        self.write(|t| {
            let created_at = t
                .homepage
                .iter()
                .find(|s| s.id == input.id)
                .map(|s| s.created_at)
                .unwrap_or(updated_at);
            let section = HomepageContent {
                id: input.id,
                section_type: input.section_type,
                title: input.title,
                subtitle: input.subtitle,
                learn_more_url: input.learn_more_url,
                listen_now_url: input.listen_now_url,
                image_url: input.image_url,
                created_at,
                updated_at,
            };
            t.homepage.retain(|s| s.id != section.id);
            t.homepage.push(section.clone());
            Ok(section)
        })
    }
}
