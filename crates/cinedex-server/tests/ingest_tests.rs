//! End-to-end bulk load tests
//!
//! Each test gets a fresh database from `sqlx::test` and a wiremock server
//! standing in for the IMDb dataset host.

use cinedex_server::features::titles::queries::{list, ListTitlesQuery};
use cinedex_server::ingest::models::{RATINGS_TABLE, TITLES_TABLE};
use cinedex_server::ingest::{storage, BulkLoader, FetchError, LoadError, LoadOutcome};
use sqlx::PgPool;
use tempfile::TempDir;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod helpers;

use helpers::{ingest_config, mount_datasets, ratings_tsv, titles_tsv};

async fn counts(pool: &PgPool) -> (i64, i64) {
    (
        storage::count_rows(pool, TITLES_TABLE).await.unwrap(),
        storage::count_rows(pool, RATINGS_TABLE).await.unwrap(),
    )
}

#[sqlx::test(migrations = false)]
async fn test_first_load_inserts_movies_and_ratings(pool: PgPool) {
    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();

    let outcome = BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await
        .unwrap();

    let LoadOutcome::Loaded(report) = outcome else {
        panic!("first run should load");
    };
    assert_eq!(report.titles.read, 4, "the episode is filtered out");
    assert_eq!(report.titles.inserted, 4);
    assert_eq!(report.ratings.read, 5);
    assert_eq!(report.ratings.inserted, 5);
    assert_eq!(counts(&pool).await, (4, 5));

    // Missing values land as defaults, never NULL
    let (year, runtime, genres, adult): (i32, i32, String, bool) = sqlx::query_as(
        "SELECT start_year, runtime_minutes, genres, is_adult FROM movies WHERE tconst = $1",
    )
    .bind("tt9999998")
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((year, runtime, genres.as_str(), adult), (0, 0, "", false));

    let (rating, votes): (f64, i32) =
        sqlx::query_as("SELECT average_rating, num_votes FROM rating_movies WHERE tconst = $1")
            .bind("tt9999998")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((rating, votes), (0.0, 0));

    // Decompressed files stay behind for the next run
    assert!(dir.path().join("movies.tsv").exists());
    assert!(dir.path().join("ratings.tsv").exists());
}

#[sqlx::test(migrations = false)]
async fn test_second_run_is_skipped(pool: PgPool) {
    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = ingest_config(&server, dir.path());

    let first = BulkLoader::new(config.clone()).unwrap().run(&pool).await.unwrap();
    assert!(matches!(first, LoadOutcome::Loaded(_)));

    let second = BulkLoader::new(config).unwrap().run(&pool).await.unwrap();
    assert!(matches!(second, LoadOutcome::Skipped));
    assert_eq!(counts(&pool).await, (4, 5));
}

#[sqlx::test(migrations = false)]
async fn test_forced_rerun_inserts_nothing_new(pool: PgPool) {
    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = ingest_config(&server, dir.path());

    BulkLoader::new(config.clone()).unwrap().run(&pool).await.unwrap();

    // Files are reused from disk, so the mock still sees a single request each
    let outcome = BulkLoader::new(config).unwrap().force(true).run(&pool).await.unwrap();
    let LoadOutcome::Loaded(report) = outcome else {
        panic!("forced run should load");
    };
    assert_eq!(report.titles.read, 4);
    assert_eq!(report.titles.inserted, 0);
    assert_eq!(report.ratings.inserted, 0);
    assert_eq!(counts(&pool).await, (4, 5));
}

#[sqlx::test(migrations = false)]
async fn test_partially_loaded_database_is_completed(pool: PgPool) {
    storage::ensure_schema(&pool).await.unwrap();
    sqlx::query(
        "INSERT INTO movies (tconst, title_type, primary_title, original_title, is_adult, \
         start_year, end_year, runtime_minutes, genres) \
         VALUES ('tt0111161', 'movie', 'Kept As Is', 'Kept As Is', FALSE, 1994, 0, 142, 'Drama')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();

    let outcome = BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await
        .unwrap();
    let LoadOutcome::Loaded(report) = outcome else {
        panic!("ratings were empty, the load must run");
    };
    assert_eq!(report.titles.inserted, 3);
    assert_eq!(counts(&pool).await, (4, 5));

    let title: String = sqlx::query_scalar("SELECT primary_title FROM movies WHERE tconst = $1")
        .bind("tt0111161")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "Kept As Is");
}

#[sqlx::test(migrations = false)]
async fn test_missing_dataset_aborts_without_writing(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let result = BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await;

    assert!(matches!(
        result,
        Err(LoadError::Fetch(FetchError::Status { .. }))
    ));
    assert_eq!(counts(&pool).await, (0, 0));
}

#[sqlx::test(migrations = false)]
async fn test_failure_in_ratings_rolls_back_titles(pool: PgPool) {
    // Both files are already decompressed, so nothing is downloaded
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("movies.tsv"), titles_tsv()).unwrap();

    // Postgres rejects NUL in text values. The appended row is in the last
    // ratings batch, after every titles batch has been written
    let mut ratings = ratings_tsv();
    ratings.push_str("tt00\u{0}0001\t5.0\t10\n");
    std::fs::write(dir.path().join("ratings.tsv"), ratings).unwrap();

    let result = BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await;

    assert!(matches!(result, Err(LoadError::Database(_))), "got {:?}", result);
    assert_eq!(counts(&pool).await, (0, 0));

    // The lock was released: a later run with clean files goes through
    std::fs::write(dir.path().join("ratings.tsv"), ratings_tsv()).unwrap();
    let outcome = BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await
        .unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded(_)));
    assert_eq!(counts(&pool).await, (4, 5));
}

#[sqlx::test(migrations = false)]
async fn test_concurrent_loads_write_once(pool: PgPool) {
    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = ingest_config(&server, dir.path());

    let first = BulkLoader::new(config.clone()).unwrap();
    let second = BulkLoader::new(config).unwrap();
    let (a, b) = tokio::join!(first.run(&pool), second.run(&pool));

    let outcomes = [a.unwrap(), b.unwrap()];
    let loaded = outcomes
        .iter()
        .filter(|o| matches!(o, LoadOutcome::Loaded(_)))
        .count();
    assert_eq!(loaded, 1, "the loader that waited must see the data and skip");
    assert!(outcomes.iter().any(|o| matches!(o, LoadOutcome::Skipped)));
    assert_eq!(counts(&pool).await, (4, 5));
}

#[sqlx::test(migrations = false)]
async fn test_loaded_titles_are_listed(pool: PgPool) {
    let server = MockServer::start().await;
    mount_datasets(&server, 1).await;
    let dir = TempDir::new().unwrap();

    BulkLoader::new(ingest_config(&server, dir.path()))
        .unwrap()
        .run(&pool)
        .await
        .unwrap();

    let query = ListTitlesQuery {
        genre: Some("DRAMA".to_string()),
        ..Default::default()
    };
    let response = list::handle(pool, query).await.unwrap();
    let ids: Vec<&str> = response.results.iter().map(|m| m.tconst.as_str()).collect();
    assert_eq!(ids, vec!["tt0068646", "tt0111161"]);
    assert_eq!(response.results[1].runtime, 142);
}
