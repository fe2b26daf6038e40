//! GeoJSON engine: byte acquisition, gzip detection, parsing, normalization
//! and the worker host that runs loads off the caller's thread.
mod decompress;
mod engine;
mod fetch;
mod normalize;
mod pipeline;
mod progress;
mod source;
mod types;

pub use decompress::{decode_utf8, decompress_gzip, detect_compression, Compression, GZIP_MAGIC};
pub use engine::EngineHandle;
pub use fetch::{open_url, FetchSettings};
pub use normalize::{normalize, FeatureCollection, INVALID_FORMAT};
pub use pipeline::{
    ingest, select_strategy, IngestSettings, Strategy, DEFAULT_CHUNK_THRESHOLD,
    DEFAULT_READ_CHUNK_SIZE,
};
pub use progress::{acquisition_percent, format_bytes, ProgressSink, ACQUISITION_BUDGET};
pub use source::{
    BodyStream, ByteBuffer, ByteSource, FileChunks, MemoryChunks, RawSource, StreamChunks,
};
pub use types::{
    EngineEvent, ErrorKind, IngestError, LoadId, Phase, ProgressEvent, WorkerMessage,
};
