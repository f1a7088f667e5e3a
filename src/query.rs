//! Cached content reads.
//!
//! Every read goes through [`QueryClient`], a `moka` cache keyed by
//! [`QueryKey`]. A cached value is served until it outlives the freshness
//! window or a mutation invalidates it (see `mutations::invalidation_for`).

use moka::future::Cache;
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use uuid::Uuid;

use crate::{
    models::{BlogPost, Documentary, Entity, HomepageContent, Podcast},
    mutations::KeyPattern,
    repository::{Repository, RepositoryError, RepositoryState},
};

/// QueryKey
///
/// Identifies one cached read: the entity plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    BlogPosts,
    RecentBlogPosts(i64),
    BlogPost(Uuid),
    BlogPostsCount,
    Podcasts,
    RecentPodcasts(i64),
    Podcast(Uuid),
    PodcastsCount,
    Documentaries,
    Documentary(Uuid),
    DocumentariesCount,
    HomepageSection(String),
}

impl QueryKey {
    pub fn entity(&self) -> Entity {
        match self {
            QueryKey::BlogPosts
            | QueryKey::RecentBlogPosts(_)
            | QueryKey::BlogPost(_)
            | QueryKey::BlogPostsCount => Entity::BlogPost,
            QueryKey::Podcasts
            | QueryKey::RecentPodcasts(_)
            | QueryKey::Podcast(_)
            | QueryKey::PodcastsCount => Entity::Podcast,
            QueryKey::Documentaries | QueryKey::Documentary(_) | QueryKey::DocumentariesCount => {
                Entity::Documentary
            }
            QueryKey::HomepageSection(_) => Entity::HomepageContent,
        }
    }

    /// True for the "N most recent" lists, whatever N.
    pub fn is_recent_list(&self) -> bool {
        matches!(self, QueryKey::RecentBlogPosts(_) | QueryKey::RecentPodcasts(_))
    }
}

/// QueryValue
///
/// A cached result. The variant always corresponds to the key it is stored
/// under.
#[derive(Debug, Clone)]
pub enum QueryValue {
    BlogPosts(Vec<BlogPost>),
    BlogPost(Option<BlogPost>),
    Podcasts(Vec<Podcast>),
    Podcast(Option<Podcast>),
    Documentaries(Vec<Documentary>),
    Documentary(Option<Documentary>),
    HomepageSection(Option<HomepageContent>),
    Count(i64),
}

/// Attempts a read makes when invalidations keep landing while it loads.
const MAX_FETCH_ATTEMPTS: usize = 3;

/// QueryClient
///
/// Shared query cache. Concurrent fetches of one key are coalesced into a
/// single backend request, and failed fetches are never stored.
///
/// Every entity carries an invalidation generation. A cached value remembers
/// the generation its load started under; once an invalidation of that entity
/// has happened since, the value is dropped and loaded again. This covers a
/// load that was already in flight when a write invalidated its key.
#[derive(Clone)]
pub struct QueryClient {
    cache: Cache<QueryKey, (u64, QueryValue)>,
    generations: Arc<Mutex<HashMap<Entity, u64>>>,
}

impl QueryClient {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(stale_time)
                .build(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn generation(&self, entity: Entity) -> u64 {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .copied()
            .unwrap_or_default()
    }

    /// Returns the cached value for `key`, or runs `loader` and caches its
    /// successful result.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, loader: F) -> Result<QueryValue, Arc<RepositoryError>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<QueryValue, RepositoryError>>,
    {
        let entity = key.entity();
        let mut attempt = 1;
        loop {
            let (started, value) = self
                .cache
                .try_get_with(key.clone(), async {
                    let started = self.generation(entity);
                    loader().await.map(|value| (started, value))
                })
                .await?;

            if started == self.generation(entity) || attempt == MAX_FETCH_ATTEMPTS {
                return Ok(value);
            }
            tracing::debug!(query = ?key, "discarding load that raced an invalidation");
            self.cache.invalidate(&key).await;
            attempt += 1;
        }
    }

    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Drops every cached entry matched by one of `patterns`. Returns how many
    /// were dropped.
    pub async fn invalidate(&self, patterns: &[KeyPattern]) -> usize {
        {
            let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
            for pattern in patterns {
                *generations.entry(pattern.entity()).or_default() += 1;
            }
        }
        self.cache.run_pending_tasks().await;

        let stale: Vec<QueryKey> = self
            .cache
            .iter()
            .filter(|(key, _)| patterns.iter().any(|p| p.matches(key)))
            .map(|(key, _)| QueryKey::clone(&key))
            .collect();

        for key in &stale {
            self.cache.invalidate(key).await;
        }
        if !stale.is_empty() {
            tracing::debug!(keys = ?stale, "invalidated cached queries");
        }
        stale.len()
    }
}

async fn load(repo: &dyn Repository, key: &QueryKey) -> Result<QueryValue, RepositoryError> {
    Ok(match key {
        QueryKey::BlogPosts => QueryValue::BlogPosts(repo.list_blog_posts(None).await?),
        QueryKey::RecentBlogPosts(n) => QueryValue::BlogPosts(repo.list_blog_posts(Some(*n)).await?),
        QueryKey::BlogPost(id) => QueryValue::BlogPost(repo.get_blog_post(*id).await?),
        QueryKey::BlogPostsCount => QueryValue::Count(repo.count_blog_posts().await?),
        QueryKey::Podcasts => QueryValue::Podcasts(repo.list_podcasts(None).await?),
        QueryKey::RecentPodcasts(n) => QueryValue::Podcasts(repo.list_podcasts(Some(*n)).await?),
        QueryKey::Podcast(id) => QueryValue::Podcast(repo.get_podcast(*id).await?),
        QueryKey::PodcastsCount => QueryValue::Count(repo.count_podcasts().await?),
        QueryKey::Documentaries => QueryValue::Documentaries(repo.list_documentaries().await?),
        QueryKey::Documentary(id) => QueryValue::Documentary(repo.get_documentary(*id).await?),
        QueryKey::DocumentariesCount => QueryValue::Count(repo.count_documentaries().await?),
        QueryKey::HomepageSection(id) => {
            QueryValue::HomepageSection(repo.get_homepage_section(id).await?)
        }
    })
}

/// ContentQueries
///
/// Typed reads over the cache. Reads never fail: lists and counts degrade to
/// empty and zero, single-record lookups to "not found". The failure is logged.
#[derive(Clone)]
pub struct ContentQueries {
    repo: RepositoryState,
    client: QueryClient,
}

impl ContentQueries {
    pub fn new(repo: RepositoryState, client: QueryClient) -> Self {
        Self { repo, client }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    async fn read<T>(&self, key: QueryKey, fallback: T, extract: fn(QueryValue) -> Option<T>) -> T {
        let result = self
            .client
            .fetch(key.clone(), || load(self.repo.as_ref(), &key))
            .await;

        match result {
            Ok(value) => extract(value).unwrap_or(fallback),
            Err(e) => {
                tracing::error!(query = ?key, error = %e, "query failed, using fallback");
                fallback
            }
        }
    }

    // --- Blog posts ---

    pub async fn blog_posts(&self) -> Vec<BlogPost> {
        self.read(QueryKey::BlogPosts, Vec::new(), blog_posts).await
    }

    pub async fn recent_blog_posts(&self, n: i64) -> Vec<BlogPost> {
        self.read(QueryKey::RecentBlogPosts(n), Vec::new(), blog_posts)
            .await
    }

    pub async fn blog_post(&self, id: Uuid) -> Option<BlogPost> {
        self.read(QueryKey::BlogPost(id), None, |v| match v {
            QueryValue::BlogPost(post) => Some(post),
            _ => None,
        })
        .await
    }

    pub async fn blog_posts_count(&self) -> i64 {
        self.read(QueryKey::BlogPostsCount, 0, count).await
    }

    // --- Podcasts ---

    pub async fn podcasts(&self) -> Vec<Podcast> {
        self.read(QueryKey::Podcasts, Vec::new(), podcasts).await
    }

    pub async fn recent_podcasts(&self, n: i64) -> Vec<Podcast> {
        self.read(QueryKey::RecentPodcasts(n), Vec::new(), podcasts)
            .await
    }

    pub async fn podcast(&self, id: Uuid) -> Option<Podcast> {
        self.read(QueryKey::Podcast(id), None, |v| match v {
            QueryValue::Podcast(podcast) => Some(podcast),
            _ => None,
        })
        .await
    }

    pub async fn podcasts_count(&self) -> i64 {
        self.read(QueryKey::PodcastsCount, 0, count).await
    }

    // --- Documentaries ---

    pub async fn documentaries(&self) -> Vec<Documentary> {
        self.read(QueryKey::Documentaries, Vec::new(), |v| match v {
            QueryValue::Documentaries(docs) => Some(docs),
            _ => None,
        })
        .await
    }

    pub async fn documentary(&self, id: Uuid) -> Option<Documentary> {
        self.read(QueryKey::Documentary(id), None, |v| match v {
            QueryValue::Documentary(doc) => Some(doc),
            _ => None,
        })
        .await
    }

    pub async fn documentaries_count(&self) -> i64 {
        self.read(QueryKey::DocumentariesCount, 0, count).await
    }

    // --- Homepage ---

    pub async fn homepage_section(&self, id: &str) -> Option<HomepageContent> {
        self.read(QueryKey::HomepageSection(id.to_string()), None, |v| match v {
            QueryValue::HomepageSection(section) => Some(section),
            _ => None,
        })
        .await
    }
}

fn blog_posts(value: QueryValue) -> Option<Vec<BlogPost>> {
    match value {
        QueryValue::BlogPosts(posts) => Some(posts),
        _ => None,
    }
}

fn podcasts(value: QueryValue) -> Option<Vec<Podcast>> {
    match value {
        QueryValue::Podcasts(podcasts) => Some(podcasts),
        _ => None,
    }
}

fn count(value: QueryValue) -> Option<i64> {
    match value {
        QueryValue::Count(n) => Some(n),
        _ => None,
    }
}
