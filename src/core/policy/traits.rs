use crate::core::investigation::{InvestigationState, TerminationCause, Verdict};
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the policy wants done next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum NextAction {
    Retrieve {
        query: String,
    },
    Act {
        name: String,
        params: Value,
    },
    Terminate {
        verdict: Verdict,
        cause: TerminationCause,
        summary: String,
    },
}

impl NextAction {
    pub fn retrieve(query: impl Into<String>) -> Self {
        Self::Retrieve {
            query: query.into(),
        }
    }

    pub fn act(name: impl Into<String>, params: Value) -> Self {
        Self::Act {
            name: name.into(),
            params,
        }
    }

    pub fn terminate(verdict: Verdict, summary: impl Into<String>) -> Self {
        Self::Terminate {
            verdict,
            cause: TerminationCause::PolicyVerdict,
            summary: summary.into(),
        }
    }

    /// The policy caught itself repeating an action with an identical outcome.
    pub fn stuck_loop(summary: impl Into<String>) -> Self {
        Self::Terminate {
            verdict: Verdict::Inconclusive,
            cause: TerminationCause::StuckLoop,
            summary: summary.into(),
        }
    }
}

/// Maps the current state to the next move.
///
/// Implementations must be pure: the same state always yields the same
/// decision, and nothing outside the state may influence it. An `Err` aborts
/// the run with an `Errored` verdict.
pub trait DecisionPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, state: &InvestigationState) -> Result<NextAction, PolicyError>;
}
