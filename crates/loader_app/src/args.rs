use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the GeoJSON loader.
#[derive(Debug, Parser)]
#[command(
    name = "geojson-loader",
    version,
    about = "Load a GeoJSON document (optionally gzip-compressed) from a file or URL"
)]
pub struct CliArgs {
    /// Path to a .geojson/.json file (optionally .gz) or an http(s) URL
    pub source: String,

    /// Config file (default: ./geojson_loader.ron)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Sources larger than this many MiB are read in chunks
    #[arg(long = "chunk-threshold-mib")]
    pub chunk_threshold_mib: Option<u64>,

    /// Read size for chunked local sources, in KiB
    #[arg(long = "read-chunk-kib")]
    pub read_chunk_kib: Option<u64>,

    /// Also write the log to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Write the normalized FeatureCollection to this path as JSON
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}
