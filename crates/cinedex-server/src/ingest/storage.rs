//! Schema and batch writes for the title and rating tables
//!
//! Every insert is `ON CONFLICT (tconst) DO NOTHING`: rows already present are
//! left untouched, which is what makes re-running a load safe.

use sqlx::{Connection, PgConnection, PgPool, Postgres, QueryBuilder, Transaction};

use super::models::{RatingRow, TitleRow, RATINGS_TABLE, TITLES_TABLE};

const CREATE_TITLES: &str = r#"
    CREATE TABLE IF NOT EXISTS movies (
        tconst TEXT PRIMARY KEY,
        title_type TEXT,
        primary_title TEXT,
        original_title TEXT,
        is_adult BOOLEAN,
        start_year INTEGER,
        end_year INTEGER,
        runtime_minutes INTEGER,
        genres TEXT
    )
"#;

const CREATE_RATINGS: &str = r#"
    CREATE TABLE IF NOT EXISTS rating_movies (
        tconst TEXT PRIMARY KEY,
        average_rating DOUBLE PRECISION,
        num_votes INTEGER
    )
"#;

/// Create both tables if they do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TITLES).execute(pool).await?;
    sqlx::query(CREATE_RATINGS).execute(pool).await?;
    Ok(())
}

/// Whether `table` holds at least one row
///
/// `table` must be one of the table constants; it is spliced into the SQL.
pub async fn has_rows(pool: &PgPool, table: &'static str) -> Result<bool, sqlx::Error> {
    debug_assert!(table == TITLES_TABLE || table == RATINGS_TABLE);
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {})", table);
    sqlx::query_scalar::<_, bool>(&sql).fetch_one(pool).await
}

pub async fn count_rows(pool: &PgPool, table: &'static str) -> Result<i64, sqlx::Error> {
    debug_assert!(table == TITLES_TABLE || table == RATINGS_TABLE);
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await
}

/// Advisory lock key shared by every process loading into this database
const LOAD_LOCK_KEY: i64 = 0x0063_696e_6564_6578;

/// Session-level advisory lock serializing bulk loads
///
/// Held on a dedicated connection outside the pool. If the holder is dropped
/// without `release`, the connection closes and the server frees the lock.
pub(crate) struct LoadLock {
    conn: PgConnection,
}

impl LoadLock {
    /// Block until no other loader holds the lock
    pub async fn acquire(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let options = pool.connect_options();
        let mut conn = PgConnection::connect_with(&options).await?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(LOAD_LOCK_KEY)
            .execute(&mut conn)
            .await?;
        Ok(Self { conn })
    }

    pub async fn release(mut self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(LOAD_LOCK_KEY)
            .execute(&mut self.conn)
            .await?;
        self.conn.close().await
    }
}

/// A row type that can be written in multi-row batches
pub(crate) trait BatchInsert: Sized + Send + 'static {
    const TABLE: &'static str;

    /// Insert `rows`, returning how many were new
    async fn insert_batch(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self],
    ) -> Result<u64, sqlx::Error>;
}

impl BatchInsert for TitleRow {
    const TABLE: &'static str = TITLES_TABLE;

    async fn insert_batch(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO movies (
                tconst,
                title_type,
                primary_title,
                original_title,
                is_adult,
                start_year,
                end_year,
                runtime_minutes,
                genres
            )
            "#,
        );

        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.tconst)
                .push_bind(&row.title_type)
                .push_bind(&row.primary_title)
                .push_bind(&row.original_title)
                .push_bind(row.is_adult)
                .push_bind(row.start_year)
                .push_bind(row.end_year)
                .push_bind(row.runtime_minutes)
                .push_bind(&row.genres);
        });
        query_builder.push(" ON CONFLICT (tconst) DO NOTHING");

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}

impl BatchInsert for RatingRow {
    const TABLE: &'static str = RATINGS_TABLE;

    async fn insert_batch(
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO rating_movies (tconst, average_rating, num_votes) ",
        );

        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.tconst)
                .push_bind(row.average_rating)
                .push_bind(row.num_votes);
        });
        query_builder.push(" ON CONFLICT (tconst) DO NOTHING");

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}
