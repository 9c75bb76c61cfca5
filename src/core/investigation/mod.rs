pub mod audit;
pub mod clock;
pub mod orchestrator;
pub mod types;

pub use audit::ReportLog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use orchestrator::Orchestrator;
pub use types::{
    ActOutcome, Incident, InvestigationReport, InvestigationState, MAX_STEPS_HARD_CAP,
    OrchestratorSettings, ReportError, RetrievalOutcome, Step, StepRecord, TerminationCause,
    Verdict,
};
