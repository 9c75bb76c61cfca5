use crate::core::investigation::OrchestratorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationConfig {
    /// Hard ceiling on steps per run, the terminating step included.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Seconds to wait for a human decision before a write action is rejected.
    #[serde(default = "default_approval_timeout_secs")]
    pub approval_timeout_secs: u64,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    /// Minimum score in [0,1] for a passage to count as relevant.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
}

fn default_max_steps() -> u32 {
    8
}

fn default_approval_timeout_secs() -> u64 {
    300
}

fn default_retrieval_k() -> usize {
    3
}

fn default_relevance_threshold() -> f64 {
    0.5
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            approval_timeout_secs: default_approval_timeout_secs(),
            retrieval_k: default_retrieval_k(),
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

impl InvestigationConfig {
    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings::new(
            self.max_steps,
            Duration::from_secs(self.approval_timeout_secs),
            self.retrieval_k,
        )
    }
}
