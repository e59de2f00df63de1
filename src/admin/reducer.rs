use super::action::{Action, FetchPayload};
use super::state::AdministrationState;

/// Pure state transition of the administration store.
pub fn reduce(state: AdministrationState, action: &Action) -> AdministrationState {
    match action {
        Action::Request(_) => AdministrationState {
            loading: true,
            error_message: None,
            ..state
        },
        Action::Failure(_, message) => AdministrationState {
            loading: false,
            error_message: Some(message.clone()),
            ..state
        },
        Action::Success(payload) => apply_success(AdministrationState { loading: false, ..state }, payload),
        Action::WebsocketMessage(event) => AdministrationState {
            tracker: state.tracker.apply(event),
            ..state
        },
        Action::SessionEstablished | Action::SessionEnded => state,
    }
}

fn apply_success(mut state: AdministrationState, payload: &FetchPayload) -> AdministrationState {
    match payload {
        FetchPayload::GatewayRoutes(routes) => state.gateway.routes = routes.clone(),
        FetchPayload::Logs(loggers) => state.logs.loggers = loggers.clone(),
        FetchPayload::Health(health) => state.health = health.clone(),
        FetchPayload::Metrics(metrics) => state.metrics = metrics.clone(),
        FetchPayload::ThreadDump(threads) => state.thread_dump = threads.clone(),
        FetchPayload::Configurations(props) => state.configuration.config_props = props.clone(),
        FetchPayload::Env(env) => state.configuration.env = env.clone(),
        FetchPayload::Audits { audits, total_items } => {
            state.audits = audits.clone();
            state.total_items = *total_items;
        }
    }
    state
}
