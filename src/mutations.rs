//! Content writes.
//!
//! A mutation checks its required fields, uploads an attached image, submits a
//! single request to the store and then invalidates the cached queries named
//! by [`invalidation_for`]. Invalidation is the only link between a write and
//! the cached reads.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    forms::SubmissionError,
    models::{
        BlogPost, BlogPostInput, Documentary, DocumentaryInput, Entity, HomepageContent,
        HomepageContentInput, Podcast, PodcastInput,
    },
    query::{QueryClient, QueryKey},
    repository::{RepositoryError, RepositoryState},
    storage::{StorageError, StorageState, object_key},
};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Image upload failed: {0}")]
    Upload(#[from] StorageError),
    #[error("{0}")]
    Backend(#[from] RepositoryError),
    #[error("Record not found")]
    NotFound,
    #[error("Another save is still in progress")]
    Busy,
    #[error("{0}")]
    Submission(#[from] SubmissionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

/// KeyPattern
///
/// Selects cached queries to drop after a write.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPattern {
    Exact(QueryKey),
    /// Every "N most recent" list of the entity, whatever N.
    RecentLists(Entity),
    /// Every cached query of the entity.
    AllOf(Entity),
}

impl KeyPattern {
    pub fn entity(&self) -> Entity {
        match self {
            KeyPattern::Exact(key) => key.entity(),
            KeyPattern::RecentLists(entity) | KeyPattern::AllOf(entity) => *entity,
        }
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::RecentLists(entity) => key.is_recent_list() && key.entity() == *entity,
            KeyPattern::AllOf(entity) => key.entity() == *entity,
        }
    }
}

/// invalidation_for
///
/// Which cached queries a successful write makes stale:
///
/// | write                    | invalidated                                   |
/// |--------------------------|-----------------------------------------------|
/// | create                   | list, count, recent lists                     |
/// | update / delete          | the above plus the record itself              |
/// | homepage section upsert  | every cached homepage section                 |
pub fn invalidation_for(entity: Entity, op: MutationOp, id: Option<Uuid>) -> Vec<KeyPattern> {
    let (list, count, record): (QueryKey, QueryKey, fn(Uuid) -> QueryKey) = match entity {
        Entity::BlogPost => (QueryKey::BlogPosts, QueryKey::BlogPostsCount, QueryKey::BlogPost),
        Entity::Podcast => (QueryKey::Podcasts, QueryKey::PodcastsCount, QueryKey::Podcast),
        Entity::Documentary => (
            QueryKey::Documentaries,
            QueryKey::DocumentariesCount,
            QueryKey::Documentary,
        ),
        Entity::HomepageContent => return vec![KeyPattern::AllOf(Entity::HomepageContent)],
    };

    let mut patterns = vec![KeyPattern::Exact(list), KeyPattern::Exact(count)];
    if matches!(entity, Entity::BlogPost | Entity::Podcast) {
        patterns.push(KeyPattern::RecentLists(entity));
    }
    if let (MutationOp::Update | MutationOp::Delete, Some(id)) = (op, id) {
        patterns.push(KeyPattern::Exact(record(id)));
    }
    patterns
}

/// ImageUpload
///
/// A file attached to a form submission.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn require(field: &'static str, value: &str) -> Result<(), MutationError> {
    if value.trim().is_empty() {
        return Err(MutationError::MissingField(field));
    }
    Ok(())
}

/// ContentMutations
///
/// Create, update and delete for every content entity. Updates are
/// last-write-wins: nothing checks whether the record changed since it was
/// loaded into the form.
#[derive(Clone)]
pub struct ContentMutations {
    repo: RepositoryState,
    storage: StorageState,
    client: QueryClient,
}

impl ContentMutations {
    pub fn new(repo: RepositoryState, storage: StorageState, client: QueryClient) -> Self {
        Self {
            repo,
            storage,
            client,
        }
    }

    /// Uploads `image` (if any) and returns the URL the record should carry.
    /// An upload failure aborts the surrounding mutation.
    async fn resolve_image(
        &self,
        folder: &str,
        image: Option<ImageUpload>,
        current: Option<String>,
    ) -> Result<Option<String>, MutationError> {
        let Some(image) = image else {
            return Ok(current.filter(|url| !url.trim().is_empty()));
        };

        let key = object_key(folder, &image.file_name);
        let url = self
            .storage
            .upload(&key, &image.content_type, image.bytes)
            .await
            .inspect_err(|e| tracing::warn!(key = %key, error = %e, "image upload failed"))?;
        tracing::info!(key = %key, "image uploaded");
        Ok(Some(url))
    }

    async fn settle<T>(
        &self,
        entity: Entity,
        op: MutationOp,
        id: Option<Uuid>,
        result: Result<T, MutationError>,
    ) -> Result<T, MutationError> {
        match &result {
            Ok(_) => {
                self.client
                    .invalidate(&invalidation_for(entity, op, id))
                    .await;
                tracing::info!(entity = ?entity, op = ?op, id = ?id, "mutation applied");
            }
            Err(e) => tracing::warn!(entity = ?entity, op = ?op, id = ?id, error = %e, "mutation failed"),
        }
        result
    }

    // --- Blog posts ---

    pub async fn create_blog_post(
        &self,
        mut input: BlogPostInput,
        image: Option<ImageUpload>,
    ) -> Result<BlogPost, MutationError> {
        let result: Result<BlogPost, MutationError> = async {
            check_blog_post(&input)?;
            input.image_url = self.resolve_image("blog", image, input.image_url.take()).await?;
            Ok(self.repo.insert_blog_post(input).await?)
        }
        .await;
        let id = result.as_ref().ok().map(|p| p.id);
        self.settle(Entity::BlogPost, MutationOp::Create, id, result)
            .await
    }

    pub async fn update_blog_post(
        &self,
        id: Uuid,
        mut input: BlogPostInput,
        image: Option<ImageUpload>,
    ) -> Result<BlogPost, MutationError> {
        let result: Result<BlogPost, MutationError> = async {
            check_blog_post(&input)?;
            input.image_url = self.resolve_image("blog", image, input.image_url.take()).await?;
            self.repo
                .update_blog_post(id, input, Utc::now())
                .await?
                .ok_or(MutationError::NotFound)
        }
        .await;
        self.settle(Entity::BlogPost, MutationOp::Update, Some(id), result)
            .await
    }

    pub async fn delete_blog_post(&self, id: Uuid) -> Result<(), MutationError> {
        let result = match self.repo.delete_blog_post(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MutationError::NotFound),
            Err(e) => Err(e.into()),
        };
        self.settle(Entity::BlogPost, MutationOp::Delete, Some(id), result)
            .await
    }

    // --- Podcasts ---

    pub async fn create_podcast(
        &self,
        mut input: PodcastInput,
        image: Option<ImageUpload>,
    ) -> Result<Podcast, MutationError> {
        let result: Result<Podcast, MutationError> = async {
            check_podcast(&input)?;
            input.image_url = self
                .resolve_image("podcasts", image, input.image_url.take())
                .await?;
            Ok(self.repo.insert_podcast(input).await?)
        }
        .await;
        let id = result.as_ref().ok().map(|p| p.id);
        self.settle(Entity::Podcast, MutationOp::Create, id, result)
            .await
    }

    pub async fn update_podcast(
        &self,
        id: Uuid,
        mut input: PodcastInput,
        image: Option<ImageUpload>,
    ) -> Result<Podcast, MutationError> {
        let result: Result<Podcast, MutationError> = async {
            check_podcast(&input)?;
            input.image_url = self
                .resolve_image("podcasts", image, input.image_url.take())
                .await?;
            self.repo
                .update_podcast(id, input, Utc::now())
                .await?
                .ok_or(MutationError::NotFound)
        }
        .await;
        self.settle(Entity::Podcast, MutationOp::Update, Some(id), result)
            .await
    }

    pub async fn delete_podcast(&self, id: Uuid) -> Result<(), MutationError> {
        let result = match self.repo.delete_podcast(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MutationError::NotFound),
            Err(e) => Err(e.into()),
        };
        self.settle(Entity::Podcast, MutationOp::Delete, Some(id), result)
            .await
    }

    // --- Documentaries ---

    pub async fn create_documentary(
        &self,
        mut input: DocumentaryInput,
        image: Option<ImageUpload>,
    ) -> Result<Documentary, MutationError> {
        let result: Result<Documentary, MutationError> = async {
            check_documentary(&input)?;
            input.image_url = self
                .resolve_image("documentaries", image, input.image_url.take())
                .await?;
            Ok(self.repo.insert_documentary(input).await?)
        }
        .await;
        let id = result.as_ref().ok().map(|d| d.id);
        self.settle(Entity::Documentary, MutationOp::Create, id, result)
            .await
    }

    pub async fn update_documentary(
        &self,
        id: Uuid,
        mut input: DocumentaryInput,
        image: Option<ImageUpload>,
    ) -> Result<Documentary, MutationError> {
        let result: Result<Documentary, MutationError> = async {
            check_documentary(&input)?;
            input.image_url = self
                .resolve_image("documentaries", image, input.image_url.take())
                .await?;
            self.repo
                .update_documentary(id, input, Utc::now())
                .await?
                .ok_or(MutationError::NotFound)
        }
        .await;
        self.settle(Entity::Documentary, MutationOp::Update, Some(id), result)
            .await
    }

    pub async fn delete_documentary(&self, id: Uuid) -> Result<(), MutationError> {
        let result = match self.repo.delete_documentary(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MutationError::NotFound),
            Err(e) => Err(e.into()),
        };
        self.settle(Entity::Documentary, MutationOp::Delete, Some(id), result)
            .await
    }

    // --- Homepage ---

    /// Creates or replaces one homepage section, keyed by its fixed id.
    pub async fn save_homepage_section(
        &self,
        mut input: HomepageContentInput,
        image: Option<ImageUpload>,
    ) -> Result<HomepageContent, MutationError> {
        let result: Result<HomepageContent, MutationError> = async {
            require("id", &input.id)?;
            require("title", &input.title)?;
            input.image_url = self
                .resolve_image("homepage", image, input.image_url.take())
                .await?;
            Ok(self.repo.upsert_homepage_section(input, Utc::now()).await?)
        }
        .await;
        self.settle(Entity::HomepageContent, MutationOp::Update, None, result)
            .await
    }
}

fn check_blog_post(input: &BlogPostInput) -> Result<(), MutationError> {
    require("title", &input.title)?;
    require("excerpt", &input.excerpt)?;
    require("content", &input.content)?;
    require("category", &input.category)?;
    require("author", &input.author)?;
    require("date", &input.date)
}

fn check_podcast(input: &PodcastInput) -> Result<(), MutationError> {
    require("title", &input.title)?;
    require("host", &input.host)?;
    require("duration", &input.duration)?;
    require("description", &input.description)?;
    require("date", &input.date)
}

fn check_documentary(input: &DocumentaryInput) -> Result<(), MutationError> {
    require("title", &input.title)?;
    require("director", &input.director)?;
    require("duration", &input.duration)?;
    require("release_date", &input.release_date)?;
    require("description", &input.description)
}
