use std::io;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use geojson_engine::{
    BodyStream, EngineEvent, EngineHandle, ErrorKind, FeatureCollection, IngestSettings, Phase,
    ProgressEvent, RawSource, WorkerMessage,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn collect_until_terminal(engine: &mut EngineHandle) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Some(event) = engine.recv_timeout(Duration::from_secs(10)) {
        let terminal = event.message.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

/// A body that trickles whitespace forever.
fn endless_body() -> BodyStream {
    stream::unfold((), |()| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some((Ok::<_, io::Error>(Bytes::from_static(b" ")), ()))
    })
    .boxed()
}

fn percents(events: &[EngineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match &event.message {
            WorkerMessage::Progress(progress) => Some(progress.percent),
            _ => None,
        })
        .collect()
}

#[test]
fn completed_load_delivers_progress_then_document() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    engine.start(1, RawSource::memory(r#"{"type":"Point","coordinates":[1,2]}"#));

    let events = collect_until_terminal(&mut engine);

    assert!(events.iter().all(|event| event.load_id == 1));
    let percents = percents(&events);
    assert_eq!(percents.first(), Some(&0));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    match &events.last().unwrap().message {
        WorkerMessage::Complete { geojson } => assert_eq!(geojson.len(), 1),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(engine.active_load(), None);

    thread::sleep(Duration::from_millis(50));
    assert!(engine.try_recv().is_none());
}

#[test]
fn failed_load_delivers_single_error() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    engine.start(3, RawSource::memory("not json"));

    let events = collect_until_terminal(&mut engine);
    let terminal: Vec<_> = events.iter().filter(|e| e.message.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    match &terminal[0].message {
        WorkerMessage::Error { kind, error } => {
            assert_eq!(*kind, ErrorKind::JsonSyntax);
            assert!(error.starts_with("invalid JSON"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(engine.try_recv().is_none());
}

#[test]
fn new_load_supersedes_the_active_one() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    engine.start(1, RawSource::stream(None, endless_body()));

    // Make sure the first worker is actually streaming.
    let first = engine
        .recv_timeout(Duration::from_secs(10))
        .expect("first load progress");
    assert_eq!(first.load_id, 1);

    engine.start(2, RawSource::memory("[]"));
    let events = collect_until_terminal(&mut engine);

    assert!(!events.is_empty());
    assert!(events.iter().all(|event| event.load_id == 2));
    assert!(matches!(
        events.last().map(|e| &e.message),
        Some(WorkerMessage::Complete { .. })
    ));

    thread::sleep(Duration::from_millis(50));
    assert!(engine.try_recv().is_none());
}

#[test]
fn restarting_with_the_same_id_drops_queued_messages() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    let chunks: Vec<io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"[         ")),
        Ok(Bytes::from_static(b"          ")),
        Ok(Bytes::from_static(b"          ")),
    ];
    let stalled = stream::iter(chunks).chain(stream::pending()).boxed();
    engine.start(1, RawSource::stream(Some(40), stalled));

    // Let the first worker queue its progress without it being received.
    thread::sleep(Duration::from_millis(300));
    engine.start(1, RawSource::memory("[]"));
    let events = collect_until_terminal(&mut engine);

    let messages: Vec<&str> = events
        .iter()
        .filter_map(|event| match &event.message {
            WorkerMessage::Progress(progress) => Some(progress.message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        messages,
        vec!["Reading data...", "Parsing JSON...", "Processing features...", "Done"]
    );
    assert!(percents(&events).windows(2).all(|w| w[0] <= w[1]));
    match &events.last().unwrap().message {
        WorkerMessage::Complete { geojson } => assert!(geojson.is_empty()),
        other => panic!("expected completion, got {other:?}"),
    }

    thread::sleep(Duration::from_millis(50));
    assert!(engine.try_recv().is_none());
}

#[test]
fn terminal_message_releases_the_load_without_waiting_on_the_worker() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    engine.start(4, RawSource::memory("42"));

    let started = std::time::Instant::now();
    let events = collect_until_terminal(&mut engine);
    assert!(matches!(
        events.last().map(|e| &e.message),
        Some(WorkerMessage::Error { kind: ErrorKind::Normalization, .. })
    ));
    assert_eq!(engine.active_load(), None);
    assert!(started.elapsed() < Duration::from_secs(5));

    // A fresh load is accepted right away.
    engine.start(5, RawSource::memory("[]"));
    let events = collect_until_terminal(&mut engine);
    assert!(events.iter().all(|event| event.load_id == 5));
}

#[test]
fn cancelled_load_is_silent() {
    init_logging();
    let mut engine = EngineHandle::new(IngestSettings::default());
    engine.start(9, RawSource::stream(Some(1_000_000), endless_body()));
    assert!(engine.recv_timeout(Duration::from_secs(10)).is_some());

    assert_eq!(engine.cancel(), Some(9));
    assert_eq!(engine.active_load(), None);
    assert!(engine.recv_timeout(Duration::from_millis(100)).is_none());
    assert_eq!(engine.cancel(), None);
}

#[test]
fn messages_serialize_to_wire_shape() {
    let progress = WorkerMessage::Progress(ProgressEvent {
        phase: Phase::Parsing,
        percent: 50,
        message: "Parsing JSON...".into(),
    });
    assert_eq!(
        serde_json::to_value(&progress).unwrap(),
        json!({"type": "progress", "phase": "parsing", "progress": 50, "message": "Parsing JSON..."})
    );

    let complete = WorkerMessage::Complete {
        geojson: FeatureCollection::new(vec![]),
    };
    assert_eq!(
        serde_json::to_value(&complete).unwrap(),
        json!({"type": "complete", "geojson": {"type": "FeatureCollection", "features": []}})
    );

    let error = WorkerMessage::Error {
        kind: ErrorKind::Normalization,
        error: "Invalid GeoJSON format".into(),
    };
    assert_eq!(
        serde_json::to_value(&error).unwrap(),
        json!({"type": "error", "kind": "normalization", "error": "Invalid GeoJSON format"})
    );
}
