use crate::security::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use anyhow::Result;
use console::style;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

type ConfirmFn = fn(String) -> Result<bool>;

/// Interactive operator prompt on the controlling terminal.
///
/// One prompt owns the terminal at a time. A request the orchestrator gave up
/// on keeps the terminal until the operator answers it, so a later prompt
/// never reads the answer meant for an earlier one.
#[derive(Debug)]
pub struct CliApprovalGate {
    prompt_lock: Arc<Mutex<()>>,
    confirm: ConfirmFn,
}

impl CliApprovalGate {
    pub fn new() -> Self {
        Self {
            prompt_lock: Arc::new(Mutex::new(())),
            confirm: terminal_confirm,
        }
    }

    async fn confirm(&self, request: &ApprovalRequest) -> Result<bool> {
        let guard = Arc::clone(&self.prompt_lock).lock_owned().await;
        let rendered = render_prompt(request);
        let question = match request.params.get("repo").and_then(Value::as_str) {
            Some(repo) => format!("  Execute {} on {repo}?", request.action),
            None => format!("  Execute {}?", request.action),
        };
        let confirm = self.confirm;

        let approved = tokio::task::spawn_blocking(move || {
            let _terminal = guard;
            eprintln!();
            eprintln!("{rendered}");
            confirm(question)
        })
        .await??;
        Ok(approved)
    }
}

impl Default for CliApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

fn terminal_confirm(prompt: String) -> Result<bool> {
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

fn render_prompt(request: &ApprovalRequest) -> String {
    let params = serde_json::to_string_pretty(&request.params).unwrap_or_else(|_| "{}".into());
    let mut lines = vec![
        format!("┌─ {} ─────────────────────────", style("Write Action Approval").bold()),
        format!("│ Incident: {}", request.incident_id),
        format!("│ Step:     {}", request.step),
        format!("│ Action:   {}", style(&request.action).yellow()),
        format!("│ Summary:  {}", request.summary),
        "│ Params:".to_string(),
    ];
    lines.extend(params.lines().map(|line| format!("│   {line}")));
    lines.push("└──────────────────────────────────────────────────".to_string());
    lines.join("\n")
}

impl ApprovalGate for CliApprovalGate {
    fn name(&self) -> &str {
        "cli"
    }

    fn request_approval<'a>(
        &'a self,
        request: &'a ApprovalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move {
            match self.confirm(request).await {
                Ok(true) => Ok(ApprovalDecision::approve("approved by operator")),
                Ok(false) => Ok(ApprovalDecision::reject("denied by operator")),
                Err(e) => Ok(ApprovalDecision::reject(format!("input error: {e}"))),
            }
        })
    }
}
