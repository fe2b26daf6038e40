use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::io::AsyncReadExt;

use crate::IngestError;

/// Body of a network response (or any other producer) as a stream of chunks.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// Declared lengths are untrusted; never preallocate more than this.
const MAX_PREALLOCATION: u64 = 1024 * 1024 * 1024;

/// Where the bytes of one load come from.
pub enum RawSource {
    /// A file on local disk; its size is read from metadata when acquired.
    LocalFile { path: PathBuf },
    /// An `http(s)` URL fetched by the worker.
    Url(String),
    /// An already-open response body with an optional declared length.
    Stream {
        declared_length: Option<u64>,
        body: BodyStream,
    },
    /// Bytes already in memory, e.g. handed over by an embedding application.
    Memory { bytes: Bytes },
}

impl RawSource {
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        RawSource::LocalFile { path: path.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        RawSource::Url(url.into())
    }

    pub fn stream(declared_length: Option<u64>, body: BodyStream) -> Self {
        RawSource::Stream {
            declared_length,
            body,
        }
    }

    pub fn memory(bytes: impl Into<Bytes>) -> Self {
        RawSource::Memory {
            bytes: bytes.into(),
        }
    }

    /// Short human-readable name for logs and summaries.
    pub fn name_hint(&self) -> String {
        match self {
            RawSource::LocalFile { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            RawSource::Url(url) => url
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .unwrap_or(url)
                .to_string(),
            RawSource::Stream { .. } => "<stream>".to_string(),
            RawSource::Memory { .. } => "<memory>".to_string(),
        }
    }
}

impl fmt::Debug for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawSource::LocalFile { path } => f.debug_struct("LocalFile").field("path", path).finish(),
            RawSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            RawSource::Stream {
                declared_length, ..
            } => f
                .debug_struct("Stream")
                .field("declared_length", declared_length)
                .finish_non_exhaustive(),
            RawSource::Memory { bytes } => f
                .debug_struct("Memory")
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Pull-based chunk producer. Returns `Ok(None)` once the data is exhausted.
#[async_trait::async_trait]
pub trait ByteSource: Send {
    fn total_size(&self) -> Option<u64>;

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError>;
}

pub struct FileChunks {
    file: tokio::fs::File,
    size: u64,
    chunk_size: usize,
    finished: bool,
}

impl FileChunks {
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, IngestError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(IngestError::acquisition)?;
        let size = file
            .metadata()
            .await
            .map_err(IngestError::acquisition)?
            .len();
        Ok(Self {
            file,
            size,
            chunk_size: chunk_size.max(1),
            finished: false,
        })
    }
}

#[async_trait::async_trait]
impl ByteSource for FileChunks {
    fn total_size(&self) -> Option<u64> {
        Some(self.size)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        if self.finished {
            return Ok(None);
        }
        let mut chunk = vec![0u8; self.chunk_size];
        let read = self
            .file
            .read(&mut chunk)
            .await
            .map_err(IngestError::acquisition)?;
        if read == 0 {
            self.finished = true;
            return Ok(None);
        }
        chunk.truncate(read);
        Ok(Some(Bytes::from(chunk)))
    }
}

pub struct StreamChunks {
    body: BodyStream,
    declared_length: Option<u64>,
    finished: bool,
}

impl StreamChunks {
    pub fn new(body: BodyStream, declared_length: Option<u64>) -> Self {
        Self {
            body,
            declared_length,
            finished: false,
        }
    }
}

#[async_trait::async_trait]
impl ByteSource for StreamChunks {
    fn total_size(&self) -> Option<u64> {
        self.declared_length
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        if self.finished {
            return Ok(None);
        }
        match self.body.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(IngestError::acquisition(err)),
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

/// Splits an in-memory buffer into zero-copy chunks.
pub struct MemoryChunks {
    remaining: Bytes,
    size: u64,
    chunk_size: usize,
}

impl MemoryChunks {
    pub fn new(bytes: Bytes, chunk_size: usize) -> Self {
        Self {
            size: bytes.len() as u64,
            remaining: bytes,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait::async_trait]
impl ByteSource for MemoryChunks {
    fn total_size(&self) -> Option<u64> {
        Some(self.size)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let take = self.chunk_size.min(self.remaining.len());
        Ok(Some(self.remaining.split_to(take)))
    }
}

/// Append-only accumulation of the chunks of one load.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn with_size_hint(hint: Option<u64>) -> Self {
        Self {
            data: Vec::with_capacity(preallocation(hint)),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn received_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

fn preallocation(hint: Option<u64>) -> usize {
    hint.map(|size| size.min(MAX_PREALLOCATION))
        .and_then(|size| usize::try_from(size).ok())
        .unwrap_or(0)
}
