use std::path::{Path, PathBuf};

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    File(PathBuf),
    Url(String),
}

impl LoadRequest {
    /// Interpret user input: `http(s)` URLs are fetched, anything else is a path.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Some(LoadRequest::Url(url.to_string()))
            }
            _ => Some(LoadRequest::File(PathBuf::from(input))),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            LoadRequest::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            LoadRequest::Url(raw) => Url::parse(raw)
                .ok()
                .and_then(|url| {
                    url.path_segments()
                        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| raw.clone()),
        }
    }
}

/// Names accepted from drag-and-drop: `.geojson` / `.json`, optionally gzipped.
pub fn accepts_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(".geojson") || name.ends_with(".json")
}
