use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Whether an action can mutate external state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[strum(serialize = "read-only")]
    ReadOnly,
    #[strum(serialize = "write")]
    Write,
}

impl Capability {
    pub const fn requires_approval(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Result of invoking an action. A failure is data for the policy, not a
/// system error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { data: String },
    Failure { reason: String },
    /// The action ran without side effects and describes what it would
    /// have changed.
    DryRun { preview: String },
}

impl Outcome {
    pub fn success(data: impl Into<String>) -> Self {
        Self::Success { data: data.into() }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn dry_run(preview: impl Into<String>) -> Self {
        Self::DryRun {
            preview: preview.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun { .. })
    }
}

/// Registered description of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub capability: Capability,
    pub parameters: serde_json::Value,
}

/// Executable capability exposed to investigations.
pub trait Action: Send + Sync {
    /// Action name (what the decision policy selects)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    fn capability(&self) -> Capability;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the action. An `Err` is recorded as [`Outcome::Failure`].
    fn invoke<'a>(
        &'a self,
        params: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Outcome>> + Send + 'a>>;

    fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            capability: self.capability(),
            parameters: self.parameters_schema(),
        }
    }
}
