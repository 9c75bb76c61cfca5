pub mod cli;
pub mod slack;

pub use cli::CliApprovalGate;
pub use slack::SlackApprovalGate;

use crate::config::ApprovalConfig;
use crate::core::tools::{DRAFT_REMEDIATION_PR, FETCH_LOGS};
use crate::utils::text::truncate_with_ellipsis;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const SUMMARY_MAX_CHARS: usize = 200;

/// One proposed write action awaiting a human decision. Carries the exact
/// action name and parameters so the decision can be audited against what
/// was executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: String,
    pub incident_id: String,
    pub action: String,
    pub params: Value,
    pub summary: String,
    /// Index the guarded step will occupy in the step log.
    pub step: u32,
}

impl ApprovalRequest {
    pub fn new(
        investigation_id: &str,
        incident_id: &str,
        step: u32,
        action: &str,
        params: &Value,
    ) -> Self {
        Self {
            request_id: format!("{investigation_id}:{step}"),
            incident_id: incident_id.to_string(),
            action: action.to_string(),
            params: params.clone(),
            summary: summarize_params(action, params),
            step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub reason: String,
}

impl ApprovalDecision {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self::reject(format!("approval timed out after {after:?}"))
    }
}

/// Human-in-the-loop chokepoint for write actions.
///
/// The returned future may stay pending for as long as a human takes; the
/// orchestrator bounds it with its own timeout and drops it on expiry. An
/// `Err` is treated as a rejection.
pub trait ApprovalGate: Send + Sync {
    fn name(&self) -> &str;

    fn request_approval<'a>(
        &'a self,
        request: &'a ApprovalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApprovalDecision>> + Send + 'a>>;
}

/// Rejects everything. Default for non-interactive runs.
pub struct AutoDenyGate {
    pub reason: String,
}

impl AutoDenyGate {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ApprovalGate for AutoDenyGate {
    fn name(&self) -> &str {
        "deny"
    }

    fn request_approval<'a>(
        &'a self,
        _request: &'a ApprovalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move { Ok(ApprovalDecision::reject(self.reason.clone())) })
    }
}

#[must_use]
pub fn summarize_params(action: &str, params: &Value) -> String {
    let field = |key: &str| params.get(key).and_then(Value::as_str).unwrap_or("?");
    let raw = match action {
        FETCH_LOGS => {
            let namespace = params
                .get("namespace")
                .and_then(Value::as_str)
                .unwrap_or("default");
            format!("fetch logs of pod {namespace}/{}", field("pod"))
        }
        DRAFT_REMEDIATION_PR => format!(
            "draft PR '{}' on {} ({} -> {})",
            field("title"),
            field("repo"),
            field("head"),
            params.get("base").and_then(Value::as_str).unwrap_or("main"),
        ),
        _ => serde_json::to_string(params).unwrap_or_default(),
    };
    truncate_with_ellipsis(&raw, SUMMARY_MAX_CHARS)
}

/// Factory: build the configured gate.
pub fn create_gate(config: &ApprovalConfig) -> Result<Arc<dyn ApprovalGate>> {
    match config.mode.as_str() {
        "deny" => Ok(Arc::new(AutoDenyGate::new(
            "approval mode is 'deny': write actions are never executed",
        ))),
        "cli" => Ok(Arc::new(CliApprovalGate::new())),
        "slack" => {
            let (Some(token), Some(channel)) = (
                config.slack_bot_token.as_deref().filter(|t| !t.is_empty()),
                config.slack_channel.as_deref().filter(|c| !c.is_empty()),
            ) else {
                bail!("approval mode 'slack' requires approval.slack_bot_token and approval.slack_channel");
            };
            Ok(Arc::new(
                SlackApprovalGate::new(token, channel)
                    .with_api_base(&config.slack_api_base)
                    .with_poll_interval(Duration::from_millis(config.poll_interval_millis)),
            ))
        }
        other => bail!("unknown approval mode '{other}'"),
    }
}
