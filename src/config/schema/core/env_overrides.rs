use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workspace) = std::env::var("NEXUSOPS_WORKSPACE")
            && !workspace.is_empty()
        {
            self.workspace_dir = PathBuf::from(workspace);
        }

        if let Ok(steps) = std::env::var("NEXUSOPS_MAX_STEPS")
            && let Ok(steps) = steps.parse::<u32>()
            && steps > 0
        {
            self.investigation.max_steps = steps;
        }

        if let Ok(secs) = std::env::var("NEXUSOPS_APPROVAL_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
            && secs > 0
        {
            self.investigation.approval_timeout_secs = secs;
        }

        if let Ok(k) = std::env::var("NEXUSOPS_RETRIEVAL_K")
            && let Ok(k) = k.parse::<usize>()
            && k > 0
        {
            self.investigation.retrieval_k = k;
        }

        if let Ok(threshold) = std::env::var("NEXUSOPS_RELEVANCE_THRESHOLD")
            && let Ok(threshold) = threshold.parse::<f64>()
            && (0.0..=1.0).contains(&threshold)
        {
            self.investigation.relevance_threshold = threshold;
        }

        if let Ok(endpoint) = std::env::var("NEXUSOPS_RETRIEVAL_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.retrieval.endpoint = Some(endpoint);
        }

        if let Ok(token) = std::env::var("GITHUB_TOKEN")
            && !token.is_empty()
        {
            self.actions.github_token = Some(token);
        }

        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN")
            && !token.is_empty()
        {
            self.approval.slack_bot_token = Some(token);
        }

        if let Ok(channel) = std::env::var("SLACK_CHANNEL")
            && !channel.is_empty()
        {
            self.approval.slack_channel = Some(channel);
        }
    }
}
