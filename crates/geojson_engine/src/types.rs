use std::fmt;
use std::io;
use std::sync::Arc;

use serde::Serialize;

use crate::normalize::FeatureCollection;

pub type LoadId = u64;

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Acquiring,
    Decompressing,
    Parsing,
    Normalizing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    #[serde(rename = "progress")]
    pub percent: u8,
    pub message: String,
}

/// Host to caller message. Serializes to the `{ "type": ... }` wire shape.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress(ProgressEvent),
    Complete { geojson: FeatureCollection },
    Error { kind: ErrorKind, error: String },
}

impl WorkerMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress(_))
    }
}

impl From<Result<FeatureCollection, IngestError>> for WorkerMessage {
    fn from(result: Result<FeatureCollection, IngestError>) -> Self {
        match result {
            Ok(geojson) => WorkerMessage::Complete { geojson },
            Err(err) => WorkerMessage::Error {
                kind: err.kind(),
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct EngineEvent {
    pub load_id: LoadId,
    pub message: WorkerMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Acquisition,
    Decoding,
    Decompression,
    JsonSyntax,
    Normalization,
    Worker,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Acquisition => write!(f, "acquisition error"),
            ErrorKind::Decoding => write!(f, "decoding error"),
            ErrorKind::Decompression => write!(f, "decompression error"),
            ErrorKind::JsonSyntax => write!(f, "json syntax error"),
            ErrorKind::Normalization => write!(f, "normalization error"),
            ErrorKind::Worker => write!(f, "worker error"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read source: {0}")]
    Acquisition(#[source] Arc<io::Error>),
    #[error("source is not valid UTF-8 text (invalid byte sequence at offset {valid_up_to})")]
    Decoding { valid_up_to: usize },
    #[error("failed to decompress gzip data: {0}")]
    Decompression(#[source] Arc<io::Error>),
    #[error("invalid JSON: {message}")]
    JsonSyntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("{0}")]
    Normalization(String),
    #[error("worker failed: {0}")]
    Worker(String),
}

impl IngestError {
    pub(crate) fn acquisition(err: io::Error) -> Self {
        IngestError::Acquisition(Arc::new(err))
    }

    pub(crate) fn decompression(err: io::Error) -> Self {
        IngestError::Decompression(Arc::new(err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Acquisition(_) => ErrorKind::Acquisition,
            IngestError::Decoding { .. } => ErrorKind::Decoding,
            IngestError::Decompression(_) => ErrorKind::Decompression,
            IngestError::JsonSyntax { .. } => ErrorKind::JsonSyntax,
            IngestError::Normalization(_) => ErrorKind::Normalization,
            IngestError::Worker(_) => ErrorKind::Worker,
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::JsonSyntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}
