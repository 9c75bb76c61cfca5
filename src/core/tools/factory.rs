use super::draft_pr::DraftRemediationPrAction;
use super::fetch_logs::FetchLogsAction;
use super::registry::ActionRegistry;
use super::traits::Action;
use crate::config::ActionsConfig;
use std::time::Duration;

/// The action set every deployment carries: one read-only diagnostic and
/// one write-tagged remediation.
pub fn default_actions(config: &ActionsConfig) -> Vec<Box<dyn Action>> {
    vec![
        Box::new(FetchLogsAction::new(
            config.kubectl_path.clone(),
            config.log_tail_lines,
            Duration::from_secs(config.log_timeout_secs),
        )),
        Box::new(DraftRemediationPrAction::new(
            config.github_api_base.clone(),
            config.github_token.clone(),
        )),
    ]
}

pub fn build_registry(config: &ActionsConfig) -> ActionRegistry {
    let mut builder = ActionRegistry::builder();
    for action in default_actions(config) {
        builder.register(action);
    }
    builder.build()
}
