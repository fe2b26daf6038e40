use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

use crate::pipeline::{ingest, IngestSettings};
use crate::progress::ProgressSink;
use crate::{EngineEvent, ErrorKind, LoadId, ProgressEvent, RawSource, WorkerMessage};

/// Open while the caller still accepts messages from a load.
/// Closing it is how a worker gets terminated.
#[derive(Debug, Clone)]
struct Gate(Arc<Mutex<bool>>);

impl Gate {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self) {
        *self.lock() = false;
    }

    fn is_open(&self) -> bool {
        *self.lock()
    }
}

/// An event tagged with the handle-internal generation of the worker that
/// produced it. Caller-chosen load ids may repeat; generations never do.
struct Envelope {
    generation: u64,
    event: EngineEvent,
}

struct ChannelProgressSink {
    load_id: LoadId,
    generation: u64,
    tx: mpsc::Sender<Envelope>,
    gate: Gate,
}

impl ChannelProgressSink {
    fn send(&self, message: WorkerMessage) -> bool {
        // Holding the lock across the send means no message can slip out
        // after `Gate::close` has returned.
        let open = self.gate.lock();
        if !*open {
            return false;
        }
        self.tx
            .send(Envelope {
                generation: self.generation,
                event: EngineEvent {
                    load_id: self.load_id,
                    message,
                },
            })
            .is_ok()
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        self.send(WorkerMessage::Progress(event));
    }

    fn is_revoked(&self) -> bool {
        !self.gate.is_open()
    }
}

/// Guarantees exactly one terminal message per load, even if the worker
/// unwinds before producing a result.
struct Worker {
    sink: ChannelProgressSink,
    finished: bool,
}

impl Worker {
    fn finish(&mut self, message: WorkerMessage) {
        self.finished = true;
        self.sink.send(message);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if !self.finished {
            engine_error!("load {} worker exited without a result", self.sink.load_id);
            self.sink.send(WorkerMessage::Error {
                kind: ErrorKind::Worker,
                error: "worker exited without a result".into(),
            });
        }
    }
}

fn run_worker(mut worker: Worker, source: RawSource, settings: IngestSettings) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            worker.finish(WorkerMessage::Error {
                kind: ErrorKind::Worker,
                error: format!("failed to start worker runtime: {err}"),
            });
            return;
        }
    };

    let result = runtime.block_on(ingest(source, &settings, &worker.sink));
    if let Err(err) = &result {
        engine_warn!("load {} failed: {}", worker.sink.load_id, err);
    }
    worker.finish(result.into());
}

struct ActiveLoad {
    load_id: LoadId,
    generation: u64,
    gate: Gate,
}

/// Runs each load on its own worker thread and relays its messages.
///
/// At most one load is active. Starting another, cancelling, or dropping the
/// handle terminates the active one; nothing it sent or sends afterwards is
/// observed, even if the next load reuses its id. Worker threads are never
/// joined; a terminated worker unwinds on its own.
pub struct EngineHandle {
    settings: IngestSettings,
    event_tx: mpsc::Sender<Envelope>,
    event_rx: mpsc::Receiver<Envelope>,
    active: Option<ActiveLoad>,
    next_generation: u64,
}

impl EngineHandle {
    pub fn new(settings: IngestSettings) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            settings,
            event_tx,
            event_rx,
            active: None,
            next_generation: 0,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn active_load(&self) -> Option<LoadId> {
        self.active.as_ref().map(|active| active.load_id)
    }

    /// Start `load_id`, replacing any load in flight. The caller later
    /// receives zero or more progress events and exactly one terminal event.
    pub fn start(&mut self, load_id: LoadId, source: RawSource) {
        self.terminate_active();

        self.next_generation += 1;
        let generation = self.next_generation;
        let gate = Gate::new();
        let sink = ChannelProgressSink {
            load_id,
            generation,
            tx: self.event_tx.clone(),
            gate: gate.clone(),
        };
        let settings = self.settings.clone();
        engine_info!("starting load {} from {:?}", load_id, source);

        let spawned = thread::Builder::new()
            .name(format!("geojson-load-{load_id}"))
            .spawn(move || {
                let worker = Worker {
                    sink,
                    finished: false,
                };
                run_worker(worker, source, settings)
            });

        if let Err(err) = spawned {
            engine_error!("failed to spawn worker for load {}: {}", load_id, err);
            let _ = self.event_tx.send(Envelope {
                generation,
                event: EngineEvent {
                    load_id,
                    message: WorkerMessage::Error {
                        kind: ErrorKind::Worker,
                        error: format!("failed to spawn worker: {err}"),
                    },
                },
            });
        }

        self.active = Some(ActiveLoad {
            load_id,
            generation,
            gate,
        });
    }

    /// Terminate the active load without starting another.
    pub fn cancel(&mut self) -> Option<LoadId> {
        self.terminate_active()
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        while let Ok(envelope) = self.event_rx.try_recv() {
            if let Some(event) = self.accept(envelope) {
                return Some(event);
            }
        }
        None
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<EngineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let envelope = self.event_rx.recv_timeout(remaining).ok()?;
            if let Some(event) = self.accept(envelope) {
                return Some(event);
            }
        }
    }

    fn accept(&mut self, envelope: Envelope) -> Option<EngineEvent> {
        let Envelope { generation, event } = envelope;
        let active_generation = self.active.as_ref().map(|active| active.generation);
        if active_generation != Some(generation) {
            engine_debug!(
                "dropping message for load {} (active: {:?})",
                event.load_id,
                self.active_load()
            );
            return None;
        }
        if event.message.is_terminal() {
            self.active = None;
        }
        Some(event)
    }

    fn terminate_active(&mut self) -> Option<LoadId> {
        let active = self.active.take()?;
        active.gate.close();
        engine_info!("terminated load {}", active.load_id);
        Some(active.load_id)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.terminate_active();
    }
}
