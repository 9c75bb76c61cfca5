use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: u32,
    #[serde(default = "default_log_timeout_secs")]
    pub log_timeout_secs: u64,
    /// Without a token, remediation PRs are drafted in dry-run mode.
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,
    #[serde(default = "default_remediation_repo")]
    pub remediation_repo: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

fn default_kubectl_path() -> String {
    "kubectl".into()
}

fn default_log_tail_lines() -> u32 {
    100
}

fn default_log_timeout_secs() -> u64 {
    30
}

fn default_github_api_base() -> String {
    "https://api.github.com".into()
}

fn default_remediation_repo() -> String {
    "nexus/app".into()
}

fn default_base_branch() -> String {
    "main".into()
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            kubectl_path: default_kubectl_path(),
            log_tail_lines: default_log_tail_lines(),
            log_timeout_secs: default_log_timeout_secs(),
            github_token: None,
            github_api_base: default_github_api_base(),
            remediation_repo: default_remediation_repo(),
            base_branch: default_base_branch(),
        }
    }
}
