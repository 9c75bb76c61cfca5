use super::log::LogObserver;
use super::noop::NoopObserver;
use super::traits::Observer;
use crate::config::ObservabilityConfig;

/// Factory: create the right observer from config
pub fn create_observer(config: &ObservabilityConfig) -> Box<dyn Observer> {
    match config.backend.as_str() {
        "log" => Box::new(LogObserver::new()),
        "none" | "noop" => Box::new(NoopObserver),
        other => {
            tracing::warn!("Unknown observability backend '{other}', falling back to noop");
            Box::new(NoopObserver)
        }
    }
}
