use super::traits::{Action, Capability, Outcome};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const FETCH_LOGS: &str = "fetch_logs";

/// Maximum log output kept in the step log (256 KB).
const MAX_LOG_BYTES: usize = 262_144;
/// Environment variables forwarded to kubectl. Everything else is cleared.
const KUBECTL_ENV_VARS: &[&str] = &["PATH", "HOME", "KUBECONFIG", "LANG", "LC_ALL", "USER"];

/// Read-only diagnostic: tail a pod's logs through `kubectl logs`.
pub struct FetchLogsAction {
    kubectl: String,
    tail_lines: u32,
    timeout: Duration,
}

impl FetchLogsAction {
    pub fn new(kubectl: impl Into<String>, tail_lines: u32, timeout: Duration) -> Self {
        Self {
            kubectl: kubectl.into(),
            tail_lines: tail_lines.max(1),
            timeout,
        }
    }

    fn command_args(&self, pod: &str, namespace: &str, tail_lines: u32) -> Vec<String> {
        vec![
            "logs".to_string(),
            pod.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            format!("--tail={}", tail_lines.clamp(1, self.tail_lines)),
        ]
    }
}

/// Kubernetes object names are DNS-1123 labels/subdomains. Anything else
/// (including a leading `-` that kubectl would parse as a flag) is refused.
fn is_valid_k8s_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && !name.starts_with(['-', '.'])
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.'))
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_LOG_BYTES {
        output.truncate(output.floor_char_boundary(MAX_LOG_BYTES));
        output.push_str("\n... [logs truncated at 256KB]");
    }
    output
}

impl Action for FetchLogsAction {
    fn name(&self) -> &str {
        FETCH_LOGS
    }

    fn description(&self) -> &str {
        "Fetch recent logs from a Kubernetes pod"
    }

    fn capability(&self) -> Capability {
        Capability::ReadOnly
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pod": {
                    "type": "string",
                    "description": "Name of the pod to fetch logs from"
                },
                "namespace": {
                    "type": "string",
                    "description": "Namespace of the pod",
                    "default": "default"
                },
                "tail_lines": {
                    "type": "integer",
                    "description": "Number of lines to return from the end of the logs"
                }
            },
            "required": ["pod"]
        })
    }

    fn invoke<'a>(
        &'a self,
        params: &'a Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Outcome>> + Send + 'a>> {
        Box::pin(async move {
            let pod = params.get("pod").and_then(Value::as_str).unwrap_or("");
            let namespace = params
                .get("namespace")
                .and_then(Value::as_str)
                .unwrap_or("default");
            let tail_lines = params
                .get("tail_lines")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(self.tail_lines);

            for (field, value) in [("pod", pod), ("namespace", namespace)] {
                if !is_valid_k8s_name(value) {
                    return Ok(Outcome::failure(format!(
                        "invalid {field} name '{value}': must be a DNS-1123 name"
                    )));
                }
            }

            let mut cmd = tokio::process::Command::new(&self.kubectl);
            cmd.args(self.command_args(pod, namespace, tail_lines))
                .env_clear()
                .kill_on_drop(true);
            for var in KUBECTL_ENV_VARS {
                if let Ok(val) = std::env::var(var) {
                    cmd.env(var, val);
                }
            }

            match tokio::time::timeout(self.timeout, cmd.output()).await {
                Ok(Ok(output)) if output.status.success() => Ok(Outcome::success(
                    truncate_output(String::from_utf8_lossy(&output.stdout).to_string()),
                )),
                Ok(Ok(output)) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Ok(Outcome::failure(format!(
                        "kubectl exited with {}: {}",
                        output.status,
                        stderr.trim()
                    )))
                }
                Ok(Err(e)) => Ok(Outcome::failure(format!(
                    "failed to execute {}: {e}",
                    self.kubectl
                ))),
                Err(_) => Ok(Outcome::failure(format!(
                    "kubectl logs timed out after {}s",
                    self.timeout.as_secs()
                ))),
            }
        })
    }
}
