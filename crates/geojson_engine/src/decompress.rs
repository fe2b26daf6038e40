use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::IngestError;

/// Leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    None,
}

/// Detect compression from the magic number only.
///
/// Transports may inflate gzip bodies on the way in, so headers and file
/// extensions are not consulted.
pub fn detect_compression(bytes: &[u8]) -> Compression {
    if bytes.starts_with(&GZIP_MAGIC) {
        Compression::Gzip
    } else {
        Compression::None
    }
}

/// Inflate a complete gzip buffer. Concatenated members are decoded in order.
pub fn decompress_gzip(compressed: &[u8]) -> Result<Vec<u8>, IngestError> {
    let mut decoder = MultiGzDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(IngestError::decompression)?;
    Ok(inflated)
}

/// Take ownership of the bytes as UTF-8 text without copying.
/// A leading byte-order mark is dropped.
pub fn decode_utf8(mut bytes: Vec<u8>) -> Result<String, IngestError> {
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    String::from_utf8(bytes).map_err(|err| IngestError::Decoding {
        valid_up_to: err.utf8_error().valid_up_to(),
    })
}
