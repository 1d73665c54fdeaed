//! Title API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/movies` - Create a title with its rating
//! - `GET /api/v1/movies` - List titles with filters, sorting and paging
//! - `GET /api/v1/movies/:id` - Get a single title by IMDb id

use crate::api::response::AppError;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use super::{
    commands::{CreateTitleCommand, CreateTitleError},
    queries::{GetTitleError, GetTitleQuery, ListTitlesError, ListTitlesQuery},
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the titles router with all routes configured
///
/// # Examples
///
/// ```rust,ignore
/// use axum::Router;
/// use cinedex_server::features::titles::routes::titles_routes;
///
/// let app = Router::new()
///     .nest("/api/v1/movies", titles_routes())
///     .with_state(pool);
/// ```
pub fn titles_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_titles).post(create_title))
        .route("/:id", get(get_title))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a new title
///
/// # Endpoint
///
/// `POST /api/v1/movies`
///
/// # Request Body
///
/// ```json
/// {
///   "tconst": "tt0111161",
///   "title": "The Shawshank Redemption",
///   "genre": "Drama",
///   "year": 1994,
///   "rating": 9.3,
///   "votes": 2900000,
///   "runtime": 142
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - Title created, body is the created title
/// - `400 Bad Request` - Malformed body or validation error
/// - `409 Conflict` - A title with this id already exists
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, body))]
async fn create_title(
    State(pool): State<PgPool>,
    body: Result<Json<CreateTitleCommand>, JsonRejection>,
) -> Result<Response, TitleApiError> {
    let Json(command) = body?;
    let response = super::commands::create::handle(pool, command).await?;

    tracing::info!(tconst = %response.tconst, "Title created via API");

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a single title by id
///
/// # Endpoint
///
/// `GET /api/v1/movies/:id`
///
/// # Response
///
/// - `200 OK` - Title found
/// - `400 Bad Request` - Blank id
/// - `404 Not Found` - No title (with a rating) has this id
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool), fields(tconst = %id))]
async fn get_title(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<Response, TitleApiError> {
    let response = super::queries::get::handle(pool, GetTitleQuery::new(id)).await?;

    tracing::debug!("Title retrieved via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// List titles
///
/// # Endpoint
///
/// `GET /api/v1/movies?genre=drama&rating=8.5&sort_by=year,title&order=desc&limit=50&offset=0`
///
/// # Query Parameters
///
/// - `genre` - Case-insensitive substring of the genre list
/// - `rating` - Exact average rating
/// - `sort_by` - Comma-separated `title`, `year`, `rating` (default: title)
/// - `order` - Comma-separated `asc`/`desc`, paired by position (default: asc)
/// - `limit` - 1 to 200 (default: 50)
/// - `offset` - 0 or more (default: 0)
///
/// # Response
///
/// - `200 OK` - `{ "limit": .., "offset": .., "results": [..] }`
/// - `400 Bad Request` - Invalid query parameters
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, params))]
async fn list_titles(
    State(pool): State<PgPool>,
    params: Result<Query<ListTitlesQuery>, QueryRejection>,
) -> Result<Response, TitleApiError> {
    let Query(query) = params?;
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(count = response.results.len(), "Titles listed via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for title API endpoints
#[derive(Debug)]
enum TitleApiError {
    Create(CreateTitleError),
    Get(GetTitleError),
    List(ListTitlesError),
    Body(JsonRejection),
    Params(QueryRejection),
}

impl From<CreateTitleError> for TitleApiError {
    fn from(err: CreateTitleError) -> Self {
        Self::Create(err)
    }
}

impl From<GetTitleError> for TitleApiError {
    fn from(err: GetTitleError) -> Self {
        Self::Get(err)
    }
}

impl From<ListTitlesError> for TitleApiError {
    fn from(err: ListTitlesError) -> Self {
        Self::List(err)
    }
}

impl From<JsonRejection> for TitleApiError {
    fn from(err: JsonRejection) -> Self {
        Self::Body(err)
    }
}

impl From<QueryRejection> for TitleApiError {
    fn from(err: QueryRejection) -> Self {
        Self::Params(err)
    }
}

impl From<TitleApiError> for AppError {
    fn from(err: TitleApiError) -> Self {
        match err {
            TitleApiError::Create(CreateTitleError::DuplicateId(id)) => {
                AppError::Conflict(format!("Title with id '{}' already exists", id))
            },
            TitleApiError::Create(CreateTitleError::Database(e)) => AppError::Database(e),
            TitleApiError::Create(e) => AppError::ValidationError(e.to_string()),

            TitleApiError::Get(GetTitleError::NotFound(id)) => {
                AppError::NotFound(format!("Title '{}' not found", id))
            },
            TitleApiError::Get(GetTitleError::Database(e)) => AppError::Database(e),
            TitleApiError::Get(e @ GetTitleError::InvalidId(_)) => {
                AppError::ValidationError(e.to_string())
            },

            TitleApiError::List(ListTitlesError::Invalid(e)) => {
                AppError::ValidationError(e.to_string())
            },
            TitleApiError::List(ListTitlesError::Database(e)) => AppError::Database(e),

            TitleApiError::Body(rejection) => AppError::ValidationError(rejection.body_text()),
            TitleApiError::Params(rejection) => AppError::ValidationError(rejection.body_text()),
        }
    }
}

impl IntoResponse for TitleApiError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
