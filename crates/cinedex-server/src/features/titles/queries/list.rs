use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::compiler::{compile, CompileError, CompiledQuery, Page, SortSpec, TitleFilters};
use crate::features::shared::validation::empty_string_as_none;
use crate::features::titles::models::{MovieRecord, MovieResponse};

/// Raw list parameters as they arrive in the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTitlesQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTitlesResponse {
    pub limit: i64,
    pub offset: i64,
    pub results: Vec<MovieResponse>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListTitlesError {
    #[error("{0}")]
    Invalid(#[from] CompileError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListTitlesQuery {
    /// Validate the parameters and build the SELECT for them
    pub fn compile(&self) -> Result<(CompiledQuery, Page), CompileError> {
        let filters = TitleFilters {
            genre: self.genre.clone(),
            rating: self.rating,
        };
        let sort = SortSpec::parse(self.sort_by.as_deref(), self.order.as_deref())?;
        let page = Page::new(self.limit, self.offset)?;

        Ok((compile(&filters, &sort, page)?, page))
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListTitlesQuery,
) -> Result<ListTitlesResponse, ListTitlesError> {
    let (compiled, page) = query.compile()?;

    let records: Vec<MovieRecord> = compiled.query_as().fetch_all(&pool).await?;

    Ok(ListTitlesResponse {
        limit: page.limit(),
        offset: page.offset(),
        results: records.into_iter().map(MovieResponse::from).collect(),
    })
}
