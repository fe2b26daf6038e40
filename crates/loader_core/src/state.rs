use std::time::Duration;

use crate::view_model::AppViewModel;

pub type LoadId = u64;

/// What the caller shows after a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub name: String,
    pub size_bytes: Option<u64>,
    pub feature_count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveLoad {
    load_id: LoadId,
    name: String,
    percent: u8,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    next_load_id: LoadId,
    active: Option<ActiveLoad>,
    last_summary: Option<LoadSummary>,
    last_error: Option<String>,
    superseded_loads: u32,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            loading: self.active.is_some(),
            current_name: self.active.as_ref().map(|a| a.name.clone()),
            percent: self.active.as_ref().map_or(0, |a| a.percent),
            message: self
                .active
                .as_ref()
                .map(|a| a.message.clone())
                .unwrap_or_default(),
            last_summary: self.last_summary.clone(),
            last_error: self.last_error.clone(),
            superseded_loads: self.superseded_loads,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_load_id(&self) -> Option<LoadId> {
        self.active.as_ref().map(|a| a.load_id)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_load(&mut self, name: String) -> LoadId {
        if self.active.is_some() {
            self.superseded_loads += 1;
        }
        self.next_load_id += 1;
        let load_id = self.next_load_id;
        self.active = Some(ActiveLoad {
            load_id,
            name,
            percent: 0,
            message: "Starting...".to_string(),
        });
        self.last_error = None;
        self.dirty = true;
        load_id
    }

    pub(crate) fn apply_progress(&mut self, load_id: LoadId, percent: u8, message: String) {
        let Some(active) = self.active_mut(load_id) else {
            return;
        };
        active.percent = active.percent.max(percent.min(100));
        active.message = message;
        self.dirty = true;
    }

    pub(crate) fn apply_completed(&mut self, load_id: LoadId, summary: LoadSummary) {
        if self.active_mut(load_id).is_none() {
            return;
        }
        self.active = None;
        self.last_summary = Some(summary);
        self.last_error = None;
        self.dirty = true;
    }

    /// The previous summary stays authoritative on failure.
    pub(crate) fn apply_failed(&mut self, load_id: LoadId, message: String) {
        if self.active_mut(load_id).is_none() {
            return;
        }
        self.active = None;
        self.last_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) -> Option<LoadId> {
        let active = self.active.take()?;
        self.dirty = true;
        Some(active.load_id)
    }

    fn active_mut(&mut self, load_id: LoadId) -> Option<&mut ActiveLoad> {
        self.active.as_mut().filter(|a| a.load_id == load_id)
    }
}
