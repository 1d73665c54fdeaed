//! Shared fixtures for integration tests
//!
//! Serves small gzipped IMDb-shaped TSV files from a wiremock server so the
//! full fetch, decompress and load path runs without network access.

#![allow(dead_code)]

use cinedex_server::ingest::IngestConfig;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TITLES_PATH: &str = "/title.basics.tsv.gz";
pub const RATINGS_PATH: &str = "/title.ratings.tsv.gz";

pub const TITLES_HEADER: &str =
    "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres";
pub const RATINGS_HEADER: &str = "tconst\taverageRating\tnumVotes";

/// Three movies, one episode and one movie with missing fields
pub fn titles_tsv() -> String {
    [
        TITLES_HEADER,
        "tt0111161\tmovie\tThe Shawshank Redemption\tThe Shawshank Redemption\t0\t1994\t\\N\t142\tDrama",
        "tt0068646\tmovie\tThe Godfather\tThe Godfather\t0\t1972\t\\N\t175\tCrime,Drama",
        "tt0107048\tmovie\tGroundhog Day\tGroundhog Day\t0\t1993\t\\N\t101\tComedy,Fantasy,Romance",
        "tt0959621\ttvEpisode\tPilot\tPilot\t0\t2008\t\\N\t58\tCrime,Drama,Thriller",
        "tt9999998\tmovie\tUnknown Film\tUnknown Film\t\\N\t\\N\t\\N\t\\N\t\\N",
    ]
    .join("\n")
        + "\n"
}

/// Ratings for every title above, plus one for a title that is not a movie
pub fn ratings_tsv() -> String {
    [
        RATINGS_HEADER,
        "tt0111161\t9.3\t2900000",
        "tt0068646\t9.2\t2000000",
        "tt0107048\t8.0\t700000",
        "tt0959621\t9.0\t30000",
        "tt9999998\t\\N\t\\N",
    ]
    .join("\n")
        + "\n"
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Mount both dataset files; each may be requested at most `max_hits` times
pub async fn mount_datasets(server: &MockServer, max_hits: u64) {
    Mock::given(method("GET"))
        .and(path(TITLES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(&titles_tsv())))
        .up_to_n_times(max_hits)
        .expect(..=max_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(RATINGS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(&ratings_tsv())))
        .up_to_n_times(max_hits)
        .expect(..=max_hits)
        .mount(server)
        .await;
}

pub fn ingest_config(server: &MockServer, data_dir: &Path) -> IngestConfig {
    IngestConfig {
        data_dir: data_dir.to_path_buf(),
        titles_url: format!("{}{}", server.uri(), TITLES_PATH),
        ratings_url: format!("{}{}", server.uri(), RATINGS_PATH),
        batch_size: 2,
        http_timeout_secs: 5,
        ..IngestConfig::default()
    }
}
