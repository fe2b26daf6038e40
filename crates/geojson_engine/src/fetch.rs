use std::io;
use std::time::Duration;

use futures_util::StreamExt;

use crate::source::StreamChunks;
use crate::IngestError;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Whole-request deadline. `None` lets large downloads run to completion.
    pub request_timeout: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// Issue a GET and hand back its body as a chunk source.
///
/// Compression is left to the magic-number check, so the client never asks
/// the server for a transfer encoding and never inflates on its own.
pub async fn open_url(url: &str, settings: &FetchSettings) -> Result<StreamChunks, IngestError> {
    let parsed = reqwest::Url::parse(url).map_err(|err| {
        IngestError::acquisition(io::Error::new(io::ErrorKind::InvalidInput, err))
    })?;
    let client = build_client(settings)?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::acquisition(io::Error::other(format!(
            "HTTP error: {status}"
        ))));
    }

    let declared_length = response.content_length().filter(|len| *len > 0);
    engine_logging::engine_debug!(
        "GET {} -> {} (declared length {:?})",
        url,
        status,
        declared_length
    );

    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(reqwest_to_io))
        .boxed();
    Ok(StreamChunks::new(body, declared_length))
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, IngestError> {
    let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
    if let Some(timeout) = settings.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| IngestError::acquisition(io::Error::other(err)))
}

fn map_reqwest_error(err: reqwest::Error) -> IngestError {
    IngestError::acquisition(reqwest_to_io(err))
}

fn reqwest_to_io(err: reqwest::Error) -> io::Error {
    if err.is_timeout() {
        return io::Error::new(io::ErrorKind::TimedOut, err);
    }
    io::Error::other(err)
}
