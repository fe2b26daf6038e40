use std::io;

use crate::{IngestError, Phase, ProgressEvent};

/// Share of the 0..=100 range given to byte acquisition.
pub const ACQUISITION_BUDGET: u8 = 50;
pub const PARSE_START: u8 = 50;
pub const NORMALIZE_START: u8 = 80;
pub const DONE: u8 = 100;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    /// True once the receiving side no longer wants anything from this load.
    fn is_revoked(&self) -> bool {
        false
    }
}

/// Keeps one invocation's percent sequence non-decreasing and drops
/// acquisition updates that would not change what the observer shows.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    percent: u8,
    last_message: Option<String>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            percent: 0,
            last_message: None,
        }
    }

    /// Fails once the observer has revoked the load.
    pub(crate) fn ensure_active(&self) -> Result<(), IngestError> {
        if self.sink.is_revoked() {
            return Err(IngestError::acquisition(io::Error::new(
                io::ErrorKind::Interrupted,
                "load terminated",
            )));
        }
        Ok(())
    }

    pub(crate) fn report(&mut self, phase: Phase, percent: u8, message: impl Into<String>) {
        self.percent = self.percent.max(percent.min(DONE));
        let message = message.into();
        self.last_message = Some(message.clone());
        engine_logging::engine_trace!("progress {:?} {}% {}", phase, self.percent, message);
        self.sink.emit(ProgressEvent {
            phase,
            percent: self.percent,
            message,
        });
    }

    /// Acquisition update after `received` bytes. With a known `total` only
    /// percent changes are reported; otherwise the percent stays put and only
    /// a changed byte count is reported.
    pub(crate) fn acquisition(&mut self, received: u64, total: Option<u64>) {
        match total {
            Some(total) => {
                let percent = acquisition_percent(received, total);
                if percent > self.percent {
                    self.report(
                        Phase::Acquiring,
                        percent,
                        format!(
                            "Loading... {} / {}",
                            format_bytes(received),
                            format_bytes(total)
                        ),
                    );
                }
            }
            None => {
                let message = format!("Loading... {}", format_bytes(received));
                if self.last_message.as_deref() != Some(message.as_str()) {
                    let percent = self.percent;
                    self.report(Phase::Acquiring, percent, message);
                }
            }
        }
    }
}

/// `round(received / total * 50)`, clamped to the acquisition budget.
pub fn acquisition_percent(received: u64, total: u64) -> u8 {
    if total == 0 {
        return ACQUISITION_BUDGET;
    }
    let fraction = received as f64 / total as f64;
    let percent = (fraction * f64::from(ACQUISITION_BUDGET)).round();
    percent.clamp(0.0, f64::from(ACQUISITION_BUDGET)) as u8
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}
