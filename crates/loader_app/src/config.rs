use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use geojson_engine::{FetchSettings, IngestSettings};
use serde::{Deserialize, Serialize};

use crate::args::CliArgs;

pub const DEFAULT_CONFIG_FILENAME: &str = "geojson_loader.ron";

const MIB: u64 = 1024 * 1024;
const KIB: u64 = 1024;

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chunk_threshold_mib: u64,
    pub read_chunk_kib: u64,
    pub connect_timeout_secs: u64,
    /// Whole-request limit; unset means downloads may take as long as they need.
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let ingest = IngestSettings::default();
        Self {
            chunk_threshold_mib: ingest.chunk_threshold / MIB,
            read_chunk_kib: ingest.read_chunk_size as u64 / KIB,
            connect_timeout_secs: ingest.fetch.connect_timeout.as_secs(),
            request_timeout_secs: ingest.fetch.request_timeout.map(|t| t.as_secs()),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(mib) = args.chunk_threshold_mib {
            self.chunk_threshold_mib = mib;
        }
        if let Some(kib) = args.read_chunk_kib {
            self.read_chunk_kib = kib;
        }
        if let Some(path) = &args.log_file {
            self.log_file = Some(path.clone());
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        let read_chunk_size = usize::try_from(self.read_chunk_kib.max(1).saturating_mul(KIB))
            .unwrap_or(usize::MAX);
        IngestSettings {
            chunk_threshold: self.chunk_threshold_mib.saturating_mul(MIB),
            read_chunk_size,
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            },
        }
    }
}

pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILENAME)
}

/// A missing file means defaults. Unreadable or malformed files are errors
/// the caller reports once logging is up.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config from {path:?}"));
        }
    };

    ron::from_str(&content).with_context(|| format!("failed to parse config from {path:?}"))
}
