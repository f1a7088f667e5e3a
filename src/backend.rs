use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::{
    auth::{AuthProviderState, MockAuthProvider, SupabaseAuthClient},
    config::{AppConfig, Env},
    repository::{MemoryRepository, PostgresRepository, RepositoryState},
    storage::{MockStorageService, S3StorageClient, StorageService, StorageState},
};

/// Backend
///
/// Handles to the hosted backend: relational store, auth service and object
/// storage. Everything else in the site talks to the backend through these.
#[derive(Clone)]
pub struct Backend {
    pub repo: RepositoryState,
    pub auth: AuthProviderState,
    pub storage: StorageState,
}

impl Backend {
    /// connect
    ///
    /// Opens the Postgres pool, applies pending migrations and builds the auth
    /// and storage clients from `config`.
    pub async fn connect(config: &AppConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.db_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let storage = S3StorageClient::new(
            &config.s3_endpoint,
            &config.s3_region,
            &config.s3_key,
            &config.s3_secret,
            &config.s3_bucket,
            &config.public_storage_url,
        )
        .await;
        // The Supabase bucket is provisioned from its dashboard; only MinIO needs it.
        if config.env == Env::Local {
            storage.ensure_bucket_exists().await;
        }

        Ok(Self {
            repo: Arc::new(PostgresRepository::new(pool)),
            auth: Arc::new(SupabaseAuthClient::new(config)),
            storage: Arc::new(storage),
        })
    }

    /// Fully in-process backend with no accounts. Used by the test suite.
    pub fn in_memory() -> Self {
        Self {
            repo: Arc::new(MemoryRepository::new()),
            auth: Arc::new(MockAuthProvider::new()),
            storage: Arc::new(MockStorageService::new()),
        }
    }
}
