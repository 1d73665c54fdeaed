//! Typed rows for the `movies` and `rating_movies` tables

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Table holding one row per title.
pub const TITLES_TABLE: &str = "movies";

/// Table holding one row per rated title.
pub const RATINGS_TABLE: &str = "rating_movies";

/// A title ready for insertion into `movies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRow {
    pub tconst: String,
    pub title_type: String,
    pub primary_title: String,
    pub original_title: String,
    pub is_adult: bool,
    /// 0 when unknown
    pub start_year: i32,
    /// 0 when unknown or still running
    pub end_year: i32,
    /// 0 when unknown
    pub runtime_minutes: i32,
    /// Comma separated genre tags, e.g. "Crime,Drama"
    pub genres: String,
}

/// A rating ready for insertion into `rating_movies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub tconst: String,
    pub average_rating: f64,
    pub num_votes: i32,
}

/// Column name -> position, shared by every record read from one file
pub type HeaderIndex = Arc<HashMap<String, usize>>;

/// One raw TSV record addressed by header name
///
/// Short rows simply lack the trailing columns; lookups for them return `None`.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    columns: HeaderIndex,
    values: StringRecord,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a header row once so every data row can share it
    pub fn header_index<'a, H>(headers: H) -> HeaderIndex
    where
        H: IntoIterator<Item = &'a str>,
    {
        Arc::new(
            headers
                .into_iter()
                .enumerate()
                .map(|(i, h)| (h.to_string(), i))
                .collect(),
        )
    }

    /// Wrap a data row read from a file whose header produced `columns`
    pub fn from_csv(columns: &HeaderIndex, values: StringRecord) -> Self {
        Self {
            columns: Arc::clone(columns),
            values,
        }
    }

    pub fn from_pairs<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        Self {
            columns: Self::header_index(headers),
            values: values.into_iter().collect(),
        }
    }

    /// Set `key` to `value`, adding the column if the record does not have it
    pub fn with(mut self, key: &str, value: &str) -> Self {
        let position = match self.columns.get(key) {
            Some(&i) => i,
            None => {
                let i = self.columns.len().max(self.values.len());
                Arc::make_mut(&mut self.columns).insert(key.to_string(), i);
                i
            },
        };

        let width = self.values.len().max(position + 1);
        let mut values = StringRecord::with_capacity(self.values.as_slice().len(), width);
        for i in 0..width {
            let field = if i == position {
                value
            } else {
                self.values.get(i).unwrap_or_default()
            };
            values.push_field(field);
        }
        self.values = values;
        self
    }

    /// Raw field text, exactly as it appeared in the file
    pub fn get(&self, key: &str) -> Option<&str> {
        self.columns.get(key).and_then(|&i| self.values.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_header_name() {
        let record = RawRecord::from_pairs(["tconst", "numVotes"], ["tt0000001", "2104"]);
        assert_eq!(record.get("tconst"), Some("tt0000001"));
        assert_eq!(record.get("numVotes"), Some("2104"));
        assert_eq!(record.get("averageRating"), None);
    }

    #[test]
    fn test_short_row_has_no_trailing_fields() {
        let columns = RawRecord::header_index(["tconst", "averageRating", "numVotes"]);
        let record = RawRecord::from_csv(&columns, StringRecord::from(vec!["tt0000001"]));
        assert_eq!(record.get("tconst"), Some("tt0000001"));
        assert_eq!(record.get("numVotes"), None);
    }

    #[test]
    fn test_with_replaces_and_appends() {
        let record = RawRecord::new()
            .with("tconst", "tt0000001")
            .with("genres", "Drama")
            .with("tconst", "tt0000002");
        assert_eq!(record.get("tconst"), Some("tt0000002"));
        assert_eq!(record.get("genres"), Some("Drama"));
    }

    #[test]
    fn test_with_does_not_touch_shared_index() {
        let columns = RawRecord::header_index(["tconst"]);
        let record = RawRecord::from_csv(&columns, StringRecord::from(vec!["tt0000001"]));
        let extended = record.with("genres", "Comedy");
        assert_eq!(extended.get("genres"), Some("Comedy"));
        assert!(!columns.contains_key("genres"));
    }
}
