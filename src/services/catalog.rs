//! Movie metadata lookup.
//!
//! The streaming endpoints only need to know whether a movie exists before
//! they build a storage key from its id. Records are owned by the CRUD side
//! of the application; this service reads them.

use crate::models::movie::Movie;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("movie `{0}` already exists")]
    MovieAlreadyExists(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    async fn find_movie(&self, id: &str) -> CatalogResult<Option<Movie>>;

    /// Connectivity check for the readiness probe.
    async fn ping(&self) -> CatalogResult<()>;
}

#[derive(Clone)]
pub struct SqliteMovieCatalog {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMovieCatalog {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Run the embedded schema migration. Statements are idempotent.
    pub async fn migrate(&self) -> CatalogResult<()> {
        let statements = MIGRATION_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Add a movie record. Returns `MovieAlreadyExists` on id conflict.
    pub async fn insert_movie(&self, id: &str, title: &str) -> CatalogResult<Movie> {
        let movie = Movie {
            id: id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };

        match sqlx::query("INSERT INTO movies (id, title, created_at) VALUES (?, ?, ?)")
            .bind(&movie.id)
            .bind(&movie.title)
            .bind(movie.created_at)
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(movie),
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::MovieAlreadyExists(id.to_string()))
            }
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }
}

#[async_trait]
impl MovieCatalog for SqliteMovieCatalog {
    async fn find_movie(&self, id: &str) -> CatalogResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, created_at FROM movies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(movie)
    }

    async fn ping(&self) -> CatalogResult<()> {
        let one = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if one != 1 {
            return Err(CatalogError::Sqlx(sqlx::Error::Protocol(format!(
                "unexpected result: {}",
                one
            ))));
        }
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn catalog() -> SqliteMovieCatalog {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let catalog = SqliteMovieCatalog::new(Arc::new(pool));
        catalog.migrate().await.unwrap();
        catalog
    }

    #[tokio::test]
    async fn finds_inserted_movie() {
        let catalog = catalog().await;
        catalog.insert_movie("demo", "Demo Reel").await.unwrap();

        let movie = catalog.find_movie("demo").await.unwrap().unwrap();
        assert_eq!(movie.id, "demo");
        assert_eq!(movie.title, "Demo Reel");
        assert!(catalog.find_movie("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let catalog = catalog().await;
        catalog.insert_movie("demo", "Demo Reel").await.unwrap();
        assert!(matches!(
            catalog.insert_movie("demo", "Again").await,
            Err(CatalogError::MovieAlreadyExists(id)) if id == "demo"
        ));
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_ping_works() {
        let catalog = catalog().await;
        catalog.migrate().await.unwrap();
        catalog.ping().await.unwrap();
    }
}
