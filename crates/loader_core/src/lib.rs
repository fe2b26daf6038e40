//! Loader core: pure load-controller state machine and view-model helpers.
mod effect;
mod msg;
mod request;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use request::{accepts_file_name, LoadRequest};
pub use state::{AppState, LoadId, LoadSummary};
pub use update::update;
pub use view_model::AppViewModel;
