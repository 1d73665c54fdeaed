//! Title list query compiler
//!
//! Turns untrusted filter, sort and paging input into a parameterized SELECT.
//! Column names and sort keywords only ever come from the closed tables
//! below; every user-supplied value travels as a bound parameter.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};
use std::str::FromStr;

use crate::features::titles::models::{MOVIE_COLUMNS, MOVIE_FROM};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;
pub const DEFAULT_OFFSET: i64 = 0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid sort_by field '{0}': expected title, year or rating")]
    InvalidSortField(String),

    #[error("Invalid order value '{0}': expected asc or desc")]
    InvalidSortDirection(String),

    #[error("Limit must be between 1 and 200, got {0}")]
    LimitOutOfRange(i64),

    #[error("Offset cannot be negative, got {0}")]
    NegativeOffset(i64),

    #[error("Rating filter must be a finite number")]
    InvalidRating,
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Year,
    Rating,
}

impl SortField {
    /// Column this field sorts on
    pub fn column(self) -> &'static str {
        match self {
            SortField::Title => "m.primary_title",
            SortField::Year => "m.start_year",
            SortField::Rating => "r.average_rating",
        }
    }
}

impl FromStr for SortField {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "year" => Ok(SortField::Year),
            "rating" => Ok(SortField::Rating),
            other => Err(CompileError::InvalidSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(CompileError::InvalidSortDirection(other.to_string())),
        }
    }
}

/// Ordered list of sort keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(SortField, SortDirection)>,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            keys: vec![(SortField::Title, SortDirection::Asc)],
        }
    }
}

impl SortSpec {
    /// Parse comma-separated `sort_by` fields and `order` directions
    ///
    /// Directions pair with fields by position; fields without one sort
    /// ascending. Surplus directions must still be valid but are ignored.
    pub fn parse(sort_by: Option<&str>, order: Option<&str>) -> Result<Self, CompileError> {
        let fields = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .split(',')
                .map(|t| t.trim().parse::<SortField>())
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![SortField::Title],
        };

        let directions = match order.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .split(',')
                .map(|t| t.trim().parse::<SortDirection>())
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let keys = fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| (field, directions.get(i).copied().unwrap_or_default()))
            .collect();

        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[(SortField, SortDirection)] {
        &self.keys
    }
}

// ============================================================================
// Filters and paging
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleFilters {
    /// Case-insensitive substring of the genre list
    pub genre: Option<String>,
    /// Exact average rating
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: i64,
    offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, CompileError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(DEFAULT_OFFSET);

        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(CompileError::LimitOutOfRange(limit));
        }
        if offset < 0 {
            return Err(CompileError::NegativeOffset(offset));
        }

        Ok(Self { limit, offset })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

// ============================================================================
// Compilation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Float(f64),
    Int(i64),
}

/// SQL text plus its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl CompiledQuery {
    /// Prepare the query with every parameter bound
    pub fn query_as<'q, R>(&'q self) -> QueryAs<'q, Postgres, R, PgArguments>
    where
        R: for<'r> FromRow<'r, PgRow>,
    {
        let mut query = sqlx::query_as::<_, R>(&self.sql);
        for param in &self.params {
            query = match param {
                BindValue::Text(v) => query.bind(v.as_str()),
                BindValue::Float(v) => query.bind(*v),
                BindValue::Int(v) => query.bind(*v),
            };
        }
        query
    }

    fn bind(&mut self, value: BindValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

/// Escape LIKE metacharacters so the value matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the list query for `filters`, ordered by `sort`, windowed by `page`
pub fn compile(
    filters: &TitleFilters,
    sort: &SortSpec,
    page: Page,
) -> Result<CompiledQuery, CompileError> {
    let mut query = CompiledQuery {
        sql: format!("SELECT {} {}", MOVIE_COLUMNS.trim(), MOVIE_FROM),
        params: Vec::new(),
    };

    let mut conditions = Vec::new();

    if let Some(genre) = filters.genre.as_deref() {
        let placeholder = query.bind(BindValue::Text(format!("%{}%", escape_like(genre))));
        conditions.push(format!("m.genres ILIKE {}", placeholder));
    }

    if let Some(rating) = filters.rating {
        if !rating.is_finite() {
            return Err(CompileError::InvalidRating);
        }
        let placeholder = query.bind(BindValue::Float(rating));
        conditions.push(format!("r.average_rating = {}", placeholder));
    }

    if !conditions.is_empty() {
        query.sql.push_str(" WHERE ");
        query.sql.push_str(&conditions.join(" AND "));
    }

    let mut order: Vec<String> = sort
        .keys()
        .iter()
        .map(|(field, direction)| format!("{} {}", field.column(), direction.keyword()))
        .collect();
    // Stable pages for equal sort keys
    order.push("m.tconst ASC".to_string());
    query.sql.push_str(" ORDER BY ");
    query.sql.push_str(&order.join(", "));

    let limit = query.bind(BindValue::Int(page.limit()));
    let offset = query.bind(BindValue::Int(page.offset()));
    query.sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

    Ok(query)
}
