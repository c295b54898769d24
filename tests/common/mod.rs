use std::sync::Arc;

use stockline::config::AppConfig;
use stockline::events::{process_events, EventSender};
use stockline::services::activity_log::ActivityLog;
use stockline::AppState;
use tokio::sync::mpsc;

/// App state wired to default config with a drained event channel.
/// Must be called from within a tokio runtime.
pub fn app_state() -> AppState {
    app_state_with_config(AppConfig::default())
}

#[allow(dead_code)]
pub fn app_state_with_config(config: AppConfig) -> AppState {
    let (tx, rx) = mpsc::channel(256);
    let state = AppState::new(config, EventSender::new(tx));
    tokio::spawn(process_events(rx));
    state
}

#[allow(dead_code)]
pub fn app_state_with_activity_log(activity_log: Arc<dyn ActivityLog>) -> AppState {
    let (tx, rx) = mpsc::channel(256);
    let state =
        AppState::with_activity_log(AppConfig::default(), EventSender::new(tx), activity_log);
    tokio::spawn(process_events(rx));
    state
}
