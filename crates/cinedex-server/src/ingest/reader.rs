//! Streaming TSV reader
//!
//! Parses a decompressed dataset file on the blocking pool and hands
//! normalized rows to the async side in bounded batches, so at most a couple
//! of batches are ever held in memory regardless of file size.

use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::models::RawRecord;

/// Batches buffered between the parser and the database writer.
const CHANNEL_DEPTH: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Reader for {path} stopped unexpectedly: {reason}")]
    Aborted { path: PathBuf, reason: String },
}

/// Normalized rows of one file, delivered batch by batch
pub struct TsvBatches<T> {
    path: PathBuf,
    rx: mpsc::Receiver<Result<Vec<T>, ReadError>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> TsvBatches<T> {
    /// Start reading `path`, keeping every record `normalize` maps to `Some`
    ///
    /// The first line is the header. Fields are tab separated and never
    /// quoted; rows with fewer fields than the header are allowed. Bytes that
    /// are not valid UTF-8 are replaced with U+FFFD instead of failing the file.
    pub fn open<F>(path: impl Into<PathBuf>, batch_size: usize, normalize: F) -> Self
    where
        F: Fn(&RawRecord) -> Option<T> + Send + 'static,
    {
        let path = path.into();
        let batch_size = batch_size.max(1);
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

        let task_path = path.clone();
        let task = tokio::task::spawn_blocking(move || {
            if let Err(e) = read_batches(&task_path, batch_size, &normalize, &tx) {
                let _ = tx.blocking_send(Err(e));
            }
        });

        Self { path, rx, task }
    }

    /// Next batch, or `None` once the file is exhausted
    pub async fn next_batch(&mut self) -> Option<Result<Vec<T>, ReadError>> {
        self.rx.recv().await
    }

    /// Confirm the reader ran to completion
    ///
    /// A reader that panicked closes the channel just like one that reached
    /// the end of the file; this tells the two apart.
    pub async fn finish(self) -> Result<(), ReadError> {
        drop(self.rx);
        self.task.await.map_err(|e| ReadError::Aborted {
            path: self.path,
            reason: e.to_string(),
        })
    }
}

fn read_batches<T, F>(
    path: &Path,
    batch_size: usize,
    normalize: &F,
    tx: &mpsc::Sender<Result<Vec<T>, ReadError>>,
) -> Result<(), ReadError>
where
    F: Fn(&RawRecord) -> Option<T>,
{
    let csv_err = |source| ReadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let header = reader.byte_headers().map_err(csv_err)?.clone();
    let header = StringRecord::from_byte_record_lossy(header);
    let columns = RawRecord::header_index(header.iter());

    let mut batch = Vec::with_capacity(batch_size);
    let mut record = ByteRecord::new();
    let mut seen: u64 = 0;
    let mut kept: u64 = 0;
    let mut repaired: u64 = 0;

    while reader.read_byte_record(&mut record).map_err(csv_err)? {
        seen += 1;
        let values = decode(std::mem::take(&mut record), &mut repaired);
        let raw = RawRecord::from_csv(&columns, values);
        if let Some(row) = normalize(&raw) {
            batch.push(row);
            kept += 1;
        }

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if tx.blocking_send(Ok(full)).is_err() {
                // Receiver gone: the load was abandoned.
                return Ok(());
            }
        }
    }

    if !batch.is_empty() {
        let _ = tx.blocking_send(Ok(batch));
    }

    if repaired > 0 {
        warn!(
            "{}: {} records contained invalid UTF-8 and were decoded lossily",
            path.display(),
            repaired
        );
    }
    debug!("Read {}: {} records, {} kept", path.display(), seen, kept);
    Ok(())
}

fn decode(record: ByteRecord, repaired: &mut u64) -> StringRecord {
    StringRecord::from_byte_record(record).unwrap_or_else(|e| {
        *repaired += 1;
        let bytes = e.into_byte_record();
        if *repaired == 1 {
            warn!(
                line = bytes.position().map(|p| p.line()).unwrap_or(0),
                "Replacing invalid UTF-8 in record"
            );
        }
        StringRecord::from_byte_record_lossy(bytes)
    })
}
