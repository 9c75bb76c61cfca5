use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    InvestigationStart {
        investigation_id: String,
        incident_id: String,
    },
    StepRecorded {
        incident_id: String,
        step: u32,
        kind: String,
        detail: String,
    },
    ApprovalRequested {
        incident_id: String,
        step: u32,
        action: String,
    },
    ApprovalResolved {
        incident_id: String,
        step: u32,
        action: String,
        approved: bool,
        reason: String,
    },
    InvestigationEnd {
        incident_id: String,
        verdict: String,
        total_steps: u32,
        duration: Duration,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Core observability trait. Implement for any backend.
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
