//! Source fetcher
//!
//! Makes sure a decompressed copy of each dataset file exists in the data
//! directory. Files already on disk are reused. Both the download and the
//! decompression write to a private scratch file in the same directory that
//! is renamed into place only once complete, so an interrupted run never
//! leaves a truncated file behind under the final name.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::config::IngestConfig;

const USER_AGENT: &str = concat!("cinedex-ingest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("Failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Downloads and decompresses dataset files into a local directory
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
    data_dir: PathBuf,
}

impl SourceFetcher {
    pub fn new(data_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| FetchError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            data_dir: data_dir.into(),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(config.data_dir.clone(), config.http_timeout())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<data_dir>/<name>.tsv.gz`
    pub fn compressed_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.tsv.gz", name))
    }

    /// `<data_dir>/<name>.tsv`
    pub fn decompressed_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.tsv", name))
    }

    /// Ensure `<name>.tsv` exists locally and return its path
    ///
    /// Downloads `url` only when neither the compressed nor the decompressed
    /// file is present, and decompresses only when the `.tsv` is missing.
    pub async fn fetch(&self, name: &str, url: &str) -> Result<PathBuf> {
        let tsv = self.decompressed_path(name);
        if is_file(&tsv).await {
            info!("Reusing {}", tsv.display());
            return Ok(tsv);
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(FetchError::io(&self.data_dir))?;

        let gz = self.compressed_path(name);
        if is_file(&gz).await {
            info!("Reusing {}", gz.display());
        } else {
            self.download(url, &gz).await?;
        }

        decompress(gz, tsv.clone()).await?;
        Ok(tsv)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading {} -> {}", url, dest.display());

        let (file, scratch) = scratch_file(&self.data_dir)?.into_parts();
        let bytes = self
            .stream_to(url, tokio::fs::File::from_std(file), &scratch)
            .await?;

        scratch
            .persist(dest)
            .map_err(|e| FetchError::io(dest)(e.error))?;

        info!("Downloaded {} ({} MB)", dest.display(), bytes / (1024 * 1024));
        Ok(())
    }

    async fn stream_to(&self, url: &str, mut file: tokio::fs::File, path: &Path) -> Result<u64> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await.map_err(FetchError::io(path))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(FetchError::io(path))?;
        file.sync_all().await.map_err(FetchError::io(path))?;
        debug!("Wrote {} bytes to {}", written, path.display());

        Ok(written)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Uniquely named file in `dir`, deleted on drop unless persisted
///
/// Every writer gets its own, so concurrent fetches of the same dataset
/// never write into each other's output.
fn scratch_file(dir: &Path) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".cinedex-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(FetchError::io(dir))
}

/// Decompress `gz` into `tsv` on the blocking pool
///
/// A compressed file that fails to decode is deleted so the next run
/// downloads it again instead of failing on the same bytes forever.
async fn decompress(gz: PathBuf, tsv: PathBuf) -> Result<()> {
    info!("Decompressing {} -> {}", gz.display(), tsv.display());

    let task_gz = gz.clone();
    let outcome = tokio::task::spawn_blocking(move || gunzip(&task_gz, &tsv))
        .await
        .map_err(|e| FetchError::Io {
            path: gz.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

    match outcome {
        Ok(bytes) => {
            info!("Decompressed {} ({} MB)", gz.display(), bytes / (1024 * 1024));
            Ok(())
        },
        Err(e @ FetchError::Decompress { .. }) => {
            warn!("Removing corrupt archive {}: {}", gz.display(), e);
            let _ = tokio::fs::remove_file(&gz).await;
            Err(e)
        },
        Err(e) => Err(e),
    }
}

fn gunzip(gz: &Path, tsv: &Path) -> Result<u64> {
    let dir = tsv.parent().unwrap_or_else(|| Path::new("."));
    let scratch = scratch_file(dir)?;
    let bytes = copy_decoded(gz, scratch.as_file(), scratch.path())?;

    scratch
        .persist(tsv)
        .map_err(|e| FetchError::io(tsv)(e.error))?;
    Ok(bytes)
}

fn copy_decoded(gz: &Path, out: &File, out_path: &Path) -> Result<u64> {
    let input = File::open(gz).map_err(FetchError::io(gz))?;
    let mut decoder = flate2::read::MultiGzDecoder::new(BufReader::new(input));
    let mut output = BufWriter::new(out);

    let mut buf = vec![0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = decoder.read(&mut buf).map_err(|source| FetchError::Decompress {
            path: gz.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n]).map_err(FetchError::io(out_path))?;
        total += n as u64;
    }

    output.flush().map_err(FetchError::io(out_path))?;
    out.sync_all().map_err(FetchError::io(out_path))?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RATINGS_TSV: &str = "tconst\taverageRating\tnumVotes\ntt0000001\t5.7\t2104\n";

    fn gzip(data: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn fetcher(dir: &TempDir) -> SourceFetcher {
        SourceFetcher::new(dir.path(), Duration::from_secs(5)).unwrap()
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_fetch_downloads_and_decompresses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/title.ratings.tsv.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(RATINGS_TSV)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        let url = format!("{}/title.ratings.tsv.gz", server.uri());

        let tsv = fetcher.fetch("ratings", &url).await.unwrap();
        assert_eq!(tsv, dir.path().join("ratings.tsv"));
        assert_eq!(std::fs::read_to_string(&tsv).unwrap(), RATINGS_TSV);
        assert_eq!(entries(&dir), vec!["ratings.tsv", "ratings.tsv.gz"]);

        // Second call is served from disk; the mock expects exactly one hit.
        let again = fetcher.fetch("ratings", &url).await.unwrap();
        assert_eq!(again, tsv);
    }

    #[tokio::test]
    async fn test_existing_archive_is_not_downloaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        std::fs::write(fetcher.compressed_path("ratings"), gzip(RATINGS_TSV)).unwrap();

        let url = format!("{}/title.ratings.tsv.gz", server.uri());
        let tsv = fetcher.fetch("ratings", &url).await.unwrap();
        assert_eq!(std::fs::read_to_string(tsv).unwrap(), RATINGS_TSV);
    }

    #[tokio::test]
    async fn test_http_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        let url = format!("{}/missing.tsv.gz", server.uri());

        let err = fetcher.fetch("titles", &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);

        let err = fetcher
            .fetch("titles", "http://127.0.0.1:1/title.basics.tsv.gz")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_removed() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        let gz = fetcher.compressed_path("titles");
        std::fs::write(&gz, b"definitely not gzip").unwrap();

        let err = fetcher
            .fetch("titles", "http://127.0.0.1:1/unused")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decompress { .. }));
        assert!(!gz.exists());
        assert!(entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_truncated_archive_is_rejected() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);

        let body: String = (0..2000)
            .map(|i| format!("tt{:07}\t{}.{}\t{}\n", i, i % 10, i % 7, i * 13))
            .collect();
        let mut compressed = gzip(&body);
        compressed.truncate(compressed.len() / 2);
        std::fs::write(fetcher.compressed_path("ratings"), compressed).unwrap();

        let err = fetcher
            .fetch("ratings", "http://127.0.0.1:1/unused")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decompress { .. }));
        assert!(entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_of_same_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/title.ratings.tsv.gz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(gzip(RATINGS_TSV))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let first = fetcher(&dir);
        let second = first.clone();
        let url = format!("{}/title.ratings.tsv.gz", server.uri());

        for _ in 0..5 {
            let _ = std::fs::remove_file(first.decompressed_path("ratings"));
            let _ = std::fs::remove_file(first.compressed_path("ratings"));

            let (a, b) = tokio::join!(first.fetch("ratings", &url), second.fetch("ratings", &url));
            assert_eq!(std::fs::read_to_string(a.unwrap()).unwrap(), RATINGS_TSV);
            assert_eq!(std::fs::read_to_string(b.unwrap()).unwrap(), RATINGS_TSV);
            assert_eq!(entries(&dir), vec!["ratings.tsv", "ratings.tsv.gz"]);
        }
    }

    #[tokio::test]
    async fn test_existing_tsv_short_circuits() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir);
        std::fs::write(fetcher.decompressed_path("ratings"), RATINGS_TSV).unwrap();

        let tsv = fetcher
            .fetch("ratings", "http://127.0.0.1:1/unused")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(tsv).unwrap(), RATINGS_TSV);
    }
}
