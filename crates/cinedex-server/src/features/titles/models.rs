//! Title read model shared by the title commands and queries

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Base URL of the public IMDb title pages.
pub const IMDB_TITLE_BASE_URL: &str = "https://www.imdb.com/title/";

/// Columns selected for every title read, in `MovieRecord` order.
pub const MOVIE_COLUMNS: &str = r#"
    m.tconst,
    m.primary_title,
    m.genres,
    m.start_year,
    r.average_rating,
    m.runtime_minutes
"#;

/// Title joined with its rating; ids without both rows are never returned.
pub const MOVIE_FROM: &str = "FROM movies m JOIN rating_movies r ON m.tconst = r.tconst";

/// Database record for a joined title read
///
/// Columns are nullable in the schema, so every non-key column is optional
/// here and defaulted when building the response.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovieRecord {
    pub tconst: String,
    pub primary_title: Option<String>,
    pub genres: Option<String>,
    pub start_year: Option<i32>,
    pub average_rating: Option<f64>,
    pub runtime_minutes: Option<i32>,
}

/// A title as returned by the API
///
/// `imdb_link` is derived from `tconst` when serialized and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieResponse {
    pub tconst: String,
    pub title: String,
    pub genre: String,
    pub year: i32,
    pub rating: f64,
    pub runtime: i32,
}

impl MovieResponse {
    pub fn imdb_link(&self) -> String {
        format!("{}{}/", IMDB_TITLE_BASE_URL, self.tconst)
    }
}

impl Serialize for MovieResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MovieResponse", 7)?;
        state.serialize_field("tconst", &self.tconst)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("genre", &self.genre)?;
        state.serialize_field("year", &self.year)?;
        state.serialize_field("rating", &self.rating)?;
        state.serialize_field("runtime", &self.runtime)?;
        state.serialize_field("imdb_link", &self.imdb_link())?;
        state.end()
    }
}

impl From<MovieRecord> for MovieResponse {
    fn from(record: MovieRecord) -> Self {
        Self {
            tconst: record.tconst,
            title: record.primary_title.unwrap_or_default(),
            genre: record.genres.unwrap_or_default(),
            year: record.start_year.unwrap_or_default(),
            rating: record.average_rating.unwrap_or_default(),
            runtime: record.runtime_minutes.unwrap_or_default(),
        }
    }
}
