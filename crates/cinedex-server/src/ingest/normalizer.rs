//! Record normalization
//!
//! Turns raw IMDb TSV records into typed, null-free rows. Everything here is
//! pure: no IO, no database, and the same input always yields the same output,
//! so a failed load can simply be run again.
//!
//! Rules:
//! - `\N` marks a missing value and is treated exactly like an absent column
//! - numbers that are missing or do not parse become `0`
//! - strings that are missing become `""`
//! - booleans are `true` only for the token `1`
//! - title records whose `titleType` differs from the requested kind are
//!   dropped before any coercion happens

use super::models::{RatingRow, RawRecord, TitleRow};

/// Token IMDb uses for a missing value.
pub const MISSING: &str = "\\N";

/// Field text with the missing sentinel mapped to `None`
fn field<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
    record.get(key).filter(|v| *v != MISSING)
}

fn text(record: &RawRecord, key: &str) -> String {
    field(record, key).unwrap_or_default().to_string()
}

fn int(record: &RawRecord, key: &str) -> i32 {
    field(record, key)
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(0)
}

fn float(record: &RawRecord, key: &str) -> f64 {
    field(record, key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn flag(record: &RawRecord, key: &str) -> bool {
    matches!(field(record, key).map(str::trim), Some("1"))
}

/// Records without an identifier cannot be keyed and are skipped
fn key(record: &RawRecord) -> Option<String> {
    field(record, "tconst")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalize a `title.basics` record, keeping it only if it is of `kind`
pub fn normalize_title(record: &RawRecord, kind: &str) -> Option<TitleRow> {
    if field(record, "titleType") != Some(kind) {
        return None;
    }

    Some(TitleRow {
        tconst: key(record)?,
        title_type: kind.to_string(),
        primary_title: text(record, "primaryTitle"),
        original_title: text(record, "originalTitle"),
        is_adult: flag(record, "isAdult"),
        start_year: int(record, "startYear"),
        end_year: int(record, "endYear"),
        runtime_minutes: int(record, "runtimeMinutes"),
        genres: text(record, "genres"),
    })
}

/// Normalize a `title.ratings` record
pub fn normalize_rating(record: &RawRecord) -> Option<RatingRow> {
    Some(RatingRow {
        tconst: key(record)?,
        average_rating: float(record, "averageRating"),
        num_votes: int(record, "numVotes"),
    })
}

pub fn normalize_titles<'a, I>(records: I, kind: &str) -> Vec<TitleRow>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records
        .into_iter()
        .filter_map(|r| normalize_title(r, kind))
        .collect()
}

pub fn normalize_ratings<'a, I>(records: I) -> Vec<RatingRow>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records.into_iter().filter_map(normalize_rating).collect()
}
