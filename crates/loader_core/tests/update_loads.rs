use std::path::PathBuf;
use std::time::Duration;

use loader_core::{update, AppState, Effect, LoadId, LoadRequest, LoadSummary, Msg};

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn request_file(state: AppState, path: &str) -> (AppState, LoadId) {
    let (state, effects) = update(
        state,
        Msg::LoadRequested(LoadRequest::File(PathBuf::from(path))),
    );
    let load_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::StartLoad { load_id, .. } => Some(*load_id),
            _ => None,
        })
        .expect("start effect");
    (state, load_id)
}

fn summary(name: &str, features: usize) -> LoadSummary {
    LoadSummary {
        name: name.to_string(),
        size_bytes: Some(1024),
        feature_count: features,
        elapsed: Duration::from_millis(1500),
    }
}

#[test]
fn load_request_starts_a_load_and_tracks_progress() {
    init_logging();
    let (mut state, load_id) = request_file(AppState::new(), "/data/roads.geojson");

    let view = state.view();
    assert!(view.loading);
    assert_eq!(view.current_name.as_deref(), Some("roads.geojson"));
    assert_eq!(view.percent, 0);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (mut state, effects) = update(
        state,
        Msg::LoadProgress {
            load_id,
            percent: 50,
            message: "Parsing JSON...".into(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().percent, 50);
    assert_eq!(state.view().message, "Parsing JSON...");
    assert!(state.consume_dirty());

    let (state, _) = update(
        state,
        Msg::LoadCompleted {
            load_id,
            summary: summary("roads.geojson", 12),
        },
    );
    let view = state.view();
    assert!(!view.loading);
    assert_eq!(view.last_summary, Some(summary("roads.geojson", 12)));
    assert_eq!(view.last_error, None);
}

#[test]
fn percent_in_view_never_decreases() {
    init_logging();
    let (state, load_id) = request_file(AppState::new(), "a.geojson");
    let (state, _) = update(
        state,
        Msg::LoadProgress {
            load_id,
            percent: 80,
            message: "Processing features...".into(),
        },
    );
    let (state, _) = update(
        state,
        Msg::LoadProgress {
            load_id,
            percent: 10,
            message: "late".into(),
        },
    );
    assert_eq!(state.view().percent, 80);
}

#[test]
fn new_request_supersedes_and_stale_messages_are_ignored() {
    init_logging();
    let (state, first) = request_file(AppState::new(), "first.geojson");
    let (state, second) = request_file(state, "second.geojson");
    assert_ne!(first, second);
    assert_eq!(state.active_load_id(), Some(second));
    assert_eq!(state.view().superseded_loads, 1);

    let mut state = state;
    assert!(state.consume_dirty());
    let (mut state, _) = update(
        state,
        Msg::LoadCompleted {
            load_id: first,
            summary: summary("first.geojson", 1),
        },
    );
    assert!(!state.consume_dirty());
    assert!(state.is_loading());
    assert_eq!(state.view().last_summary, None);

    let (state, _) = update(
        state,
        Msg::LoadFailed {
            load_id: first,
            message: "stale".into(),
        },
    );
    assert_eq!(state.view().last_error, None);
    assert_eq!(state.active_load_id(), Some(second));
}

#[test]
fn failure_keeps_previous_document_authoritative() {
    init_logging();
    let (state, first) = request_file(AppState::new(), "good.geojson");
    let (state, _) = update(
        state,
        Msg::LoadCompleted {
            load_id: first,
            summary: summary("good.geojson", 3),
        },
    );

    let (state, second) = request_file(state, "bad.geojson");
    let (state, _) = update(
        state,
        Msg::LoadFailed {
            load_id: second,
            message: "invalid JSON: expected value at line 1 column 1".into(),
        },
    );

    let view = state.view();
    assert!(!view.loading);
    assert_eq!(view.last_summary, Some(summary("good.geojson", 3)));
    assert!(view.last_error.unwrap().starts_with("invalid JSON"));
    // Ready to retry.
    let (_, third) = request_file(state, "bad.geojson");
    assert!(third > second);
}

#[test]
fn cancel_emits_effect_only_while_loading() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::CancelClicked);
    assert!(effects.is_empty());

    let (state, load_id) = request_file(state, "big.geojson");
    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::CancelLoad { load_id }]);
    assert!(!state.is_loading());
}

#[test]
fn dropped_files_are_filtered_by_name() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::FileDropped(PathBuf::from("notes.txt")));
    assert!(effects.is_empty());
    assert!(!state.is_loading());

    let (state, effects) = update(state, Msg::FileDropped(PathBuf::from("osm.geojson.gz")));
    assert!(matches!(
        effects.as_slice(),
        [Effect::StartLoad { request: LoadRequest::File(path), .. }] if path.ends_with("osm.geojson.gz")
    ));
    assert!(state.is_loading());
}
