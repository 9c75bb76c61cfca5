use super::super::{
    ActionsConfig, ApprovalConfig, InvestigationConfig, ObservabilityConfig, RetrievalConfig,
};
use crate::core::investigation::MAX_STEPS_HARD_CAP;
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const REDACTED: &str = "***";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub investigation: InvestigationConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub actions: ActionsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let nexusops_dir = home.join(".nexusops");

        Self {
            workspace_dir: nexusops_dir.join("workspace"),
            config_path: nexusops_dir.join("config.toml"),
            investigation: InvestigationConfig::default(),
            retrieval: RetrievalConfig::default(),
            approval: ApprovalConfig::default(),
            actions: ActionsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let investigation = &self.investigation;
        if !(1..=MAX_STEPS_HARD_CAP).contains(&investigation.max_steps) {
            return Err(invalid(format!(
                "investigation.max_steps must be within [1, {MAX_STEPS_HARD_CAP}] (got {})",
                investigation.max_steps
            )));
        }
        if investigation.retrieval_k == 0 {
            return Err(invalid("investigation.retrieval_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&investigation.relevance_threshold) {
            return Err(invalid(format!(
                "investigation.relevance_threshold must be within [0, 1] (got {})",
                investigation.relevance_threshold
            )));
        }
        if investigation.approval_timeout_secs == 0 {
            return Err(invalid("investigation.approval_timeout_secs must be at least 1"));
        }

        match self.retrieval.backend.as_str() {
            "keyword" => {}
            "http" => {
                if self.retrieval.endpoint.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid("retrieval.backend 'http' requires retrieval.endpoint"));
                }
            }
            other => return Err(invalid(format!("unknown retrieval.backend '{other}'"))),
        }

        match self.approval.mode.as_str() {
            "deny" | "cli" => {}
            "slack" => {
                let has = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
                if !has(&self.approval.slack_bot_token) || !has(&self.approval.slack_channel) {
                    return Err(invalid(
                        "approval.mode 'slack' requires approval.slack_bot_token and approval.slack_channel",
                    ));
                }
            }
            other => return Err(invalid(format!("unknown approval.mode '{other}'"))),
        }

        match self.observability.backend.as_str() {
            "log" | "none" | "noop" => Ok(()),
            other => Err(invalid(format!("unknown observability.backend '{other}'"))),
        }
    }

    /// Copy safe to print: every credential replaced by a marker.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| REDACTED.to_string());
        let mut config = self.clone();
        config.retrieval.api_key = mask(&self.retrieval.api_key);
        config.approval.slack_bot_token = mask(&self.approval.slack_bot_token);
        config.actions.github_token = mask(&self.actions.github_token);
        config
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.workspace_dir.join("reports")
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}
