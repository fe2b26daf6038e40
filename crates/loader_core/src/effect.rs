#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a load; any load already in flight is terminated by the engine.
    StartLoad {
        load_id: crate::LoadId,
        request: crate::LoadRequest,
    },
    CancelLoad { load_id: crate::LoadId },
}
