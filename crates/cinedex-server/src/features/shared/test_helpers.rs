//! Test helpers and fixtures for database tests
//!
//! Provides utilities to reduce boilerplate in test setup.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cinedex_server::features::shared::test_helpers::*;
//!
//! #[sqlx::test(migrations = false)]
//! async fn test_something(pool: PgPool) -> sqlx::Result<()> {
//!     setup_schema(&pool).await?;
//!
//!     TestTitle::new("tt0111161", "The Shawshank Redemption")
//!         .with_year(1994)
//!         .with_rating(9.3)
//!         .insert(&pool)
//!         .await?;
//!
//!     // ... test logic ...
//!     Ok(())
//! }
//! ```

use sqlx::PgPool;

/// Create the `movies` and `rating_movies` tables
pub async fn setup_schema(pool: &PgPool) -> sqlx::Result<()> {
    crate::ingest::storage::ensure_schema(pool).await
}

/// Builder for a title with its rating
#[derive(Debug, Clone)]
pub struct TestTitle {
    pub tconst: String,
    pub title: String,
    pub genres: String,
    pub year: i32,
    pub runtime: i32,
    pub rating: f64,
    pub votes: i32,
    /// Insert the rating row too (titles without one are invisible to reads)
    pub rated: bool,
}

impl TestTitle {
    /// Create a new test title builder
    pub fn new(tconst: &str, title: &str) -> Self {
        Self {
            tconst: tconst.to_string(),
            title: title.to_string(),
            genres: "Drama".to_string(),
            year: 2000,
            runtime: 100,
            rating: 7.0,
            votes: 1000,
            rated: true,
        }
    }

    pub fn with_genres(mut self, genres: &str) -> Self {
        self.genres = genres.to_string();
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn without_rating(mut self) -> Self {
        self.rated = false;
        self
    }

    /// Insert the title (and rating, unless disabled) into the database
    pub async fn insert(self, pool: &PgPool) -> sqlx::Result<Self> {
        sqlx::query(
            r#"
            INSERT INTO movies (tconst, title_type, primary_title, original_title, is_adult,
                                start_year, end_year, runtime_minutes, genres)
            VALUES ($1, 'movie', $2, $2, FALSE, $3, 0, $4, $5)
            "#,
        )
        .bind(&self.tconst)
        .bind(&self.title)
        .bind(self.year)
        .bind(self.runtime)
        .bind(&self.genres)
        .execute(pool)
        .await?;

        if self.rated {
            sqlx::query(
                "INSERT INTO rating_movies (tconst, average_rating, num_votes) VALUES ($1, $2, $3)",
            )
            .bind(&self.tconst)
            .bind(self.rating)
            .bind(self.votes)
            .execute(pool)
            .await?;
        }

        Ok(self)
    }
}
