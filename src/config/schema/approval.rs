use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// "deny" | "cli" | "slack"
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub slack_bot_token: Option<String>,
    #[serde(default)]
    pub slack_channel: Option<String>,
    #[serde(default = "default_slack_api_base")]
    pub slack_api_base: String,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

fn default_mode() -> String {
    "deny".into()
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".into()
}

fn default_poll_interval_millis() -> u64 {
    2000
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            slack_bot_token: None,
            slack_channel: None,
            slack_api_base: default_slack_api_base(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }
}
