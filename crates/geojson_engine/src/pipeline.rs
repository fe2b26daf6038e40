//! The ingestion pipeline: acquire → decompress/decode → parse → normalize.
//!
//! Progress budget per invocation: acquisition owns 0..=50, the decompression
//! and parse markers sit at 50, normalization starts at 80 and the pipeline
//! ends at 100. Decompression and parsing run on one complete buffer, so
//! neither has an observable midpoint.

use std::time::Instant;

use engine_logging::{engine_debug, engine_info};
use serde_json::Value;

use crate::decompress::{decode_utf8, decompress_gzip, detect_compression, Compression};
use crate::fetch::{open_url, FetchSettings};
use crate::normalize::{normalize, FeatureCollection};
use crate::progress::{format_bytes, ProgressSink, ProgressTracker, DONE, NORMALIZE_START, PARSE_START};
use crate::source::{ByteBuffer, ByteSource, FileChunks, MemoryChunks, RawSource, StreamChunks};
use crate::{IngestError, Phase};

pub const DEFAULT_CHUNK_THRESHOLD: u64 = 64 * 1024 * 1024;
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Sources larger than this are read in chunks with fine-grained progress.
    pub chunk_threshold: u64,
    /// Read size for chunked local sources.
    pub read_chunk_size: usize,
    pub fetch: FetchSettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            fetch: FetchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One bulk read; only milestone progress.
    Direct,
    /// Successive chunk pulls with per-chunk progress.
    Chunked,
}

pub fn select_strategy(size: u64, threshold: u64) -> Strategy {
    if size > threshold {
        Strategy::Chunked
    } else {
        Strategy::Direct
    }
}

/// Run one complete load. On error nothing partial is returned and no further
/// progress is emitted.
pub async fn ingest(
    source: RawSource,
    settings: &IngestSettings,
    sink: &dyn ProgressSink,
) -> Result<FeatureCollection, IngestError> {
    let started = Instant::now();
    let name = source.name_hint();
    let mut progress = ProgressTracker::new(sink);
    progress.ensure_active()?;

    let bytes = acquire(source, settings, &mut progress).await?;
    progress.ensure_active()?;
    let acquired_len = bytes.len() as u64;
    engine_debug!(
        "acquired {} from {} in {:?}",
        format_bytes(acquired_len),
        name,
        started.elapsed()
    );

    let text = decode(bytes, &mut progress)?;
    progress.ensure_active()?;

    progress.report(Phase::Parsing, PARSE_START, "Parsing JSON...");
    let parse_started = Instant::now();
    let value: Value = serde_json::from_str(&text)?;
    drop(text);
    engine_debug!("parsed {} in {:?}", name, parse_started.elapsed());
    progress.ensure_active()?;

    progress.report(Phase::Normalizing, NORMALIZE_START, "Processing features...");
    let collection = normalize(value)?;
    progress.report(Phase::Normalizing, DONE, "Done");

    engine_info!(
        "loaded {} features from {} ({}) in {:?}",
        collection.len(),
        name,
        format_bytes(acquired_len),
        started.elapsed()
    );
    Ok(collection)
}

async fn acquire(
    source: RawSource,
    settings: &IngestSettings,
    progress: &mut ProgressTracker<'_>,
) -> Result<Vec<u8>, IngestError> {
    match source {
        RawSource::LocalFile { path } => {
            let size = tokio::fs::metadata(&path)
                .await
                .map_err(IngestError::acquisition)?
                .len();
            let strategy = select_strategy(size, settings.chunk_threshold);
            engine_debug!("{:?} strategy for {} ({})", strategy, path.display(), format_bytes(size));
            match strategy {
                Strategy::Direct => {
                    progress.report(Phase::Acquiring, 0, "Reading file...");
                    tokio::fs::read(&path).await.map_err(IngestError::acquisition)
                }
                Strategy::Chunked => {
                    let chunks = FileChunks::open(&path, settings.read_chunk_size).await?;
                    read_chunked(chunks, progress).await
                }
            }
        }
        RawSource::Memory { bytes } => {
            match select_strategy(bytes.len() as u64, settings.chunk_threshold) {
                Strategy::Direct => {
                    progress.report(Phase::Acquiring, 0, "Reading data...");
                    Ok(Vec::from(bytes))
                }
                Strategy::Chunked => {
                    read_chunked(MemoryChunks::new(bytes, settings.read_chunk_size), progress).await
                }
            }
        }
        RawSource::Url(url) => {
            progress.report(Phase::Acquiring, 0, "Connecting...");
            let chunks = open_url(&url, &settings.fetch).await?;
            read_chunked(chunks, progress).await
        }
        RawSource::Stream {
            declared_length,
            body,
        } => read_chunked(StreamChunks::new(body, declared_length), progress).await,
    }
}

async fn read_chunked(
    mut source: impl ByteSource,
    progress: &mut ProgressTracker<'_>,
) -> Result<Vec<u8>, IngestError> {
    let total = source.total_size().filter(|size| *size > 0);
    let mut buffer = ByteBuffer::with_size_hint(total);
    progress.report(Phase::Acquiring, 0, "Streaming...");

    while let Some(chunk) = source.next_chunk().await? {
        progress.ensure_active()?;
        buffer.push(&chunk);
        progress.acquisition(buffer.received_bytes(), total);
    }

    Ok(buffer.into_inner())
}

/// Consumes the acquired buffer; the compressed copy is released before the
/// text is handed on.
fn decode(bytes: Vec<u8>, progress: &mut ProgressTracker<'_>) -> Result<String, IngestError> {
    match detect_compression(&bytes) {
        Compression::Gzip => {
            progress.report(Phase::Decompressing, PARSE_START, "Decompressing...");
            let inflated = decompress_gzip(&bytes)?;
            engine_debug!(
                "gzip: {} -> {}",
                format_bytes(bytes.len() as u64),
                format_bytes(inflated.len() as u64)
            );
            drop(bytes);
            decode_utf8(inflated)
        }
        Compression::None => decode_utf8(bytes),
    }
}
