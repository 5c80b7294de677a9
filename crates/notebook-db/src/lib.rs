//! # notebook-db
//!
//! PostgreSQL storage for the notebook service.
//!
//! This crate provides:
//! - Connection pool management
//! - Note and tag repositories with transaction-scoped writes
//! - Embedded schema migrations
//!
//! ## Example
//!
//! ```rust,ignore
//! use notebook_db::{Database, NewNote};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notebook").await?;
//!     db.migrate().await?;
//!
//!     let mut tx = db.begin().await?;
//!     let note_id = db.notes.insert_tx(&mut tx, &NewNote {
//!         title: "Hello".to_string(),
//!         author: "admin".to_string(),
//!         content: "<p>Hello, world!</p>".to_string(),
//!         plain_text: "Hello,world!".to_string(),
//!         private: false,
//!         words: 12,
//!     }).await?;
//!     tx.commit().await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```
pub mod notes;
pub mod pool;
pub mod tags;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use notebook_core::*;

pub use notes::{fold_rows, sort_by_recency, NoteTagRow, PgNoteRepository};
pub use pool::{create_pool, create_pool_with_config, validate_schema_name, PoolConfig};
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository.
    pub notes: PgNoteRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Begin a transaction. Rolls back on drop unless committed.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(Error::Database)
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
