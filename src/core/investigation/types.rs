use crate::core::retrieval::RetrievalResult;
use crate::core::tools::Outcome;
use crate::error::InvestigationError;
use crate::security::approval::ApprovalDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Ceiling applied to any configured step budget.
pub const MAX_STEPS_HARD_CAP: u32 = 64;

/// The seed of an investigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Incident {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Terminal classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Verdict {
    /// A remediation was executed.
    Resolved,
    /// Root cause identified; nothing was changed.
    Diagnosed,
    Inconclusive,
    /// Knowledge retrieval kept failing.
    Degraded,
    Errored,
    Cancelled,
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationCause {
    PolicyVerdict,
    StuckLoop,
    BudgetExhausted,
    Cancelled,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Results { results: Vec<RetrievalResult> },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActOutcome {
    Executed { outcome: Outcome },
    /// The approval gate rejected the action; it never ran.
    Blocked { reason: String },
}

impl ActOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Executed { outcome } if outcome.is_success())
    }

    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Text of the failure or rejection, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Executed {
                outcome: Outcome::Failure { reason },
            }
            | Self::Blocked { reason } => Some(reason.as_str()),
            Self::Executed { .. } => None,
        }
    }
}

/// One logged unit of progress. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Retrieve {
        query: String,
        outcome: RetrievalOutcome,
    },
    Act {
        action: String,
        params: Value,
        capability: crate::core::tools::Capability,
        /// Present for write actions: the decision that allowed or blocked it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approval: Option<ApprovalDecision>,
        outcome: ActOutcome,
    },
    Terminate {
        verdict: Verdict,
        cause: TerminationCause,
        summary: String,
    },
}

impl Step {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Retrieve { .. } => "retrieve",
            Self::Act { .. } => "act",
            Self::Terminate { .. } => "terminate",
        }
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Retrieve {
                query,
                outcome: RetrievalOutcome::Results { results },
            } => format!("'{query}' -> {} result(s)", results.len()),
            Self::Retrieve {
                query,
                outcome: RetrievalOutcome::Unavailable { reason },
            } => format!("'{query}' -> unavailable: {reason}"),
            Self::Act {
                action, outcome, ..
            } => match outcome {
                ActOutcome::Executed {
                    outcome: Outcome::Success { .. },
                } => format!("{action} -> success"),
                ActOutcome::Executed {
                    outcome: Outcome::Failure { reason },
                } => format!("{action} -> failure: {reason}"),
                ActOutcome::Executed {
                    outcome: Outcome::DryRun { .. },
                } => format!("{action} -> dry run"),
                ActOutcome::Blocked { reason } => format!("{action} -> blocked: {reason}"),
            },
            Self::Terminate { verdict, cause, .. } => format!("{verdict} ({cause})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the log.
    pub index: u32,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub step: Step,
}

/// Per-run state. Owned by a single run and only ever grown by appending.
#[derive(Debug, Clone)]
pub struct InvestigationState {
    incident: Incident,
    steps: Vec<StepRecord>,
    iteration: u32,
    terminated: bool,
}

impl InvestigationState {
    pub fn new(incident: Incident) -> Self {
        Self {
            incident,
            steps: Vec::new(),
            iteration: 0,
            terminated: false,
        }
    }

    pub fn incident(&self) -> &Incident {
        &self.incident
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Appends a step. Returns `None` once a terminating step has been
    /// recorded; the log is closed after that.
    pub fn append(&mut self, step: Step, recorded_at: DateTime<Utc>) -> Option<&StepRecord> {
        if self.terminated {
            return None;
        }
        self.iteration += 1;
        self.terminated = matches!(step, Step::Terminate { .. });
        self.steps.push(StepRecord {
            index: self.iteration,
            recorded_at,
            step,
        });
        self.steps.last()
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last().map(|record| &record.step)
    }

    pub fn retrievals(&self) -> impl Iterator<Item = (&str, &RetrievalOutcome)> {
        self.steps.iter().filter_map(|record| match &record.step {
            Step::Retrieve { query, outcome } => Some((query.as_str(), outcome)),
            _ => None,
        })
    }

    /// Every attempt of `action`, oldest first.
    pub fn attempts<'a>(
        &'a self,
        action: &'a str,
    ) -> impl Iterator<Item = (&'a Value, &'a ActOutcome)> + 'a {
        self.steps.iter().filter_map(move |record| match &record.step {
            Step::Act {
                action: name,
                params,
                outcome,
                ..
            } if name == action => Some((params, outcome)),
            _ => None,
        })
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self.last_step() {
            Some(Step::Terminate { verdict, .. }) => Some(*verdict),
            _ => None,
        }
    }

    pub(crate) fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}

/// Error attached to a report when a run aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub kind: String,
    pub message: String,
}

impl From<&InvestigationError> for ReportError {
    fn from(err: &InvestigationError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Final, order-preserving audit record of one run. Produced for every run,
/// including aborted and cancelled ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub investigation_id: String,
    pub incident: Incident,
    pub steps: Vec<StepRecord>,
    pub verdict: Verdict,
    pub total_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InvestigationReport {
    pub fn summary(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|record| match &record.step {
            Step::Terminate { summary, .. } => Some(summary.as_str()),
            _ => None,
        })
    }

    pub fn termination_cause(&self) -> Option<TerminationCause> {
        self.steps.iter().rev().find_map(|record| match &record.step {
            Step::Terminate { cause, .. } => Some(*cause),
            _ => None,
        })
    }
}

/// Per-orchestrator knobs. Construct through [`OrchestratorSettings::new`],
/// which clamps out-of-range values and logs a warning when it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Maximum log length, the terminating step included.
    pub max_steps: u32,
    pub approval_timeout: Duration,
    pub retrieval_k: usize,
}

impl OrchestratorSettings {
    pub fn new(max_steps: u32, approval_timeout: Duration, retrieval_k: usize) -> Self {
        let clamped = max_steps.clamp(1, MAX_STEPS_HARD_CAP);
        if clamped != max_steps {
            tracing::warn!(
                requested = max_steps,
                effective = clamped,
                "max_steps out of range; clamped"
            );
        }
        Self {
            max_steps: clamped,
            approval_timeout,
            retrieval_k: retrieval_k.max(1),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::new(8, Duration::from_secs(300), 3)
    }
}
