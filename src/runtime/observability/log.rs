use super::traits::{Observer, ObserverEvent};
use tracing::{info, warn};

/// Log-based observer backed by `tracing`
#[derive(Debug, Default)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::InvestigationStart {
                investigation_id,
                incident_id,
            } => {
                info!(investigation_id = %investigation_id, incident_id = %incident_id, "investigation.start");
            }
            ObserverEvent::StepRecorded {
                incident_id,
                step,
                kind,
                detail,
            } => {
                info!(incident_id = %incident_id, step = step, kind = %kind, detail = %detail, "investigation.step");
            }
            ObserverEvent::ApprovalRequested {
                incident_id,
                step,
                action,
            } => {
                info!(incident_id = %incident_id, step = step, action = %action, "approval.requested");
            }
            ObserverEvent::ApprovalResolved {
                incident_id,
                step,
                action,
                approved,
                reason,
            } => {
                info!(
                    incident_id = %incident_id,
                    step = step,
                    action = %action,
                    approved = approved,
                    reason = %reason,
                    "approval.resolved"
                );
            }
            ObserverEvent::InvestigationEnd {
                incident_id,
                verdict,
                total_steps,
                duration,
            } => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                info!(
                    incident_id = %incident_id,
                    verdict = %verdict,
                    total_steps = total_steps,
                    duration_ms = ms,
                    "investigation.end"
                );
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
