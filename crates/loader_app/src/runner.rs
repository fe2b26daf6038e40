use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use engine_logging::{engine_debug, engine_info, engine_warn};
use geojson_engine::{
    EngineEvent, EngineHandle, FeatureCollection, IngestSettings, RawSource, WorkerMessage,
};
use loader_core::{update, AppState, Effect, LoadId, LoadRequest, LoadSummary, Msg};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct PendingLoad {
    load_id: LoadId,
    name: String,
    size_bytes: Option<u64>,
    started: Instant,
}

/// Drives the load controller: feeds it messages, performs its effects
/// against the engine and renders state changes to the terminal.
pub struct LoadRunner {
    engine: EngineHandle,
    state: AppState,
    pending: Option<PendingLoad>,
    output: Option<PathBuf>,
    render: bool,
}

impl LoadRunner {
    pub fn new(settings: IngestSettings, output: Option<PathBuf>) -> Self {
        Self {
            engine: EngineHandle::new(settings),
            state: AppState::new(),
            pending: None,
            output,
            render: true,
        }
    }

    #[cfg(test)]
    fn quiet(mut self) -> Self {
        self.render = false;
        self
    }

    /// Load `request` and block until it completes or fails.
    pub fn run(&mut self, request: LoadRequest) -> anyhow::Result<LoadSummary> {
        self.dispatch(Msg::LoadRequested(request));

        while self.state.is_loading() {
            match self.engine.recv_timeout(POLL_INTERVAL) {
                Some(event) => {
                    let msg = self.translate(event);
                    self.dispatch(msg);
                }
                None => self.dispatch(Msg::Tick),
            }
        }

        let view = self.state.view();
        if let Some(error) = view.last_error {
            return Err(anyhow!(error));
        }
        view.last_summary
            .context("load finished without producing a document")
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.run_effects(effects);

        if self.state.consume_dirty() {
            self.render_progress();
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartLoad { load_id, request } => {
                    let name = request.display_name();
                    let (size_bytes, source) = match request {
                        LoadRequest::File(path) => {
                            (fs::metadata(&path).ok().map(|m| m.len()), RawSource::local_file(path))
                        }
                        LoadRequest::Url(url) => (None, RawSource::url(url)),
                    };
                    engine_info!("StartLoad load_id={} name={}", load_id, name);
                    self.pending = Some(PendingLoad {
                        load_id,
                        name,
                        size_bytes,
                        started: Instant::now(),
                    });
                    self.engine.start(load_id, source);
                }
                Effect::CancelLoad { load_id } => {
                    engine_info!("CancelLoad load_id={}", load_id);
                    self.engine.cancel();
                    self.pending = None;
                }
            }
        }
    }

    fn translate(&mut self, event: EngineEvent) -> Msg {
        let load_id = event.load_id;
        match event.message {
            WorkerMessage::Progress(progress) => Msg::LoadProgress {
                load_id,
                percent: progress.percent,
                message: progress.message,
            },
            WorkerMessage::Complete { geojson } => match self.finish(load_id, &geojson) {
                Ok(summary) => Msg::LoadCompleted { load_id, summary },
                Err(err) => Msg::LoadFailed {
                    load_id,
                    message: format!("{err:#}"),
                },
            },
            WorkerMessage::Error { kind, error } => {
                engine_warn!("load {} failed ({}): {}", load_id, kind, error);
                Msg::LoadFailed {
                    load_id,
                    message: error,
                }
            }
        }
    }

    fn finish(&mut self, load_id: LoadId, geojson: &FeatureCollection) -> anyhow::Result<LoadSummary> {
        let pending = self
            .pending
            .take()
            .filter(|pending| pending.load_id == load_id)
            .with_context(|| format!("no pending load {load_id}"))?;

        if let Some(path) = &self.output {
            write_output(path, geojson)?;
            engine_info!("wrote {} features to {:?}", geojson.len(), path);
        }

        Ok(LoadSummary {
            name: pending.name,
            size_bytes: pending.size_bytes,
            feature_count: geojson.len(),
            elapsed: pending.started.elapsed(),
        })
    }

    fn render_progress(&self) {
        let view = self.state.view();
        engine_debug!("view: {:?}", view);
        if self.render && view.loading {
            eprintln!("[{:>3}%] {}", view.percent, view.message);
        }
    }
}

fn write_output(path: &Path, geojson: &FeatureCollection) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, geojson)
        .with_context(|| format!("failed to write {path:?}"))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn init_logging() {
        engine_logging::initialize_for_tests();
    }

    #[test]
    fn file_load_produces_summary_and_output() {
        init_logging();
        let temp = tempfile::TempDir::new().unwrap();
        let input = temp.path().join("point.geojson");
        fs::write(&input, r#"{"type":"Point","coordinates":[1,2]}"#).unwrap();
        let output = temp.path().join("out.json");

        let mut runner =
            LoadRunner::new(IngestSettings::default(), Some(output.clone())).quiet();
        let summary = runner.run(LoadRequest::File(input.clone())).unwrap();

        assert_eq!(summary.name, "point.geojson");
        assert_eq!(summary.feature_count, 1);
        assert_eq!(summary.size_bytes, Some(fs::metadata(&input).unwrap().len()));

        let written: Value = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [1, 2]},
                    "properties": {}
                }]
            })
        );
    }

    #[test]
    fn failed_load_is_an_error() {
        init_logging();
        let temp = tempfile::TempDir::new().unwrap();
        let input = temp.path().join("scalar.json");
        fs::write(&input, "42").unwrap();

        let mut runner = LoadRunner::new(IngestSettings::default(), None).quiet();
        let err = runner.run(LoadRequest::File(input)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid GeoJSON format");
    }

    #[test]
    fn missing_file_is_an_error() {
        init_logging();
        let temp = tempfile::TempDir::new().unwrap();
        let mut runner = LoadRunner::new(IngestSettings::default(), None).quiet();
        assert!(runner
            .run(LoadRequest::File(temp.path().join("nope.geojson")))
            .is_err());
    }
}
