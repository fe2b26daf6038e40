use crate::{accepts_file_name, AppState, Effect, LoadRequest, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::LoadRequested(request) => start_load(&mut state, request),
        Msg::FileDropped(path) => {
            if accepts_file_name(&path) {
                start_load(&mut state, LoadRequest::File(path))
            } else {
                Vec::new()
            }
        }
        Msg::LoadProgress {
            load_id,
            percent,
            message,
        } => {
            state.apply_progress(load_id, percent, message);
            Vec::new()
        }
        Msg::LoadCompleted { load_id, summary } => {
            state.apply_completed(load_id, summary);
            Vec::new()
        }
        Msg::LoadFailed { load_id, message } => {
            state.apply_failed(load_id, message);
            Vec::new()
        }
        Msg::CancelClicked => match state.cancel() {
            Some(load_id) => vec![Effect::CancelLoad { load_id }],
            None => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_load(state: &mut AppState, request: LoadRequest) -> Vec<Effect> {
    let load_id = state.begin_load(request.display_name());
    vec![Effect::StartLoad { load_id, request }]
}
