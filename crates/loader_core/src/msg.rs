use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a file or entered a URL.
    LoadRequested(crate::LoadRequest),
    /// A file was dropped onto the map; only GeoJSON-looking names are loaded.
    FileDropped(PathBuf),
    /// Engine progress for a load.
    LoadProgress {
        load_id: crate::LoadId,
        percent: u8,
        message: String,
    },
    /// Engine delivered the normalized document for a load.
    LoadCompleted {
        load_id: crate::LoadId,
        summary: crate::LoadSummary,
    },
    /// Engine reported a failure for a load.
    LoadFailed {
        load_id: crate::LoadId,
        message: String,
    },
    /// User clicked Cancel.
    CancelClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
