use crate::security::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://slack.com/api";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Posts the approval request to a Slack channel and waits for a threaded
/// `approve` or `deny` reply.
///
/// Polling never gives up on its own; the orchestrator's approval timeout
/// drops the future.
pub struct SlackApprovalGate {
    pub bot_token: String,
    pub channel: String,
    api_base: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl SlackApprovalGate {
    #[must_use]
    pub fn new(bot_token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            channel: channel.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        if !api_base.is_empty() {
            self.api_base = api_base.trim_end_matches('/').to_string();
        }
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    fn approval_message_payload(&self, request: &ApprovalRequest) -> Value {
        let params = serde_json::to_string_pretty(&request.params).unwrap_or_default();
        serde_json::json!({
            "channel": self.channel,
            "text": format!(
                "Write action approval required\nIncident: {}\nStep: {}\nAction: {}\nSummary: {}\n```{params}```\nReply in thread with `approve` or `deny`.",
                request.incident_id, request.step, request.action, request.summary
            ),
        })
    }

    /// Returns the message `ts`, which identifies the thread to poll.
    pub async fn send_approval_message(&self, request: &ApprovalRequest) -> Result<String> {
        let response = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&self.approval_message_payload(request))
            .send()
            .await
            .context("send Slack approval message")?
            .error_for_status()
            .context("Slack chat.postMessage rejected")?;

        let body: Value = response
            .json()
            .await
            .context("parse Slack chat.postMessage response")?;
        check_ok(&body, "chat.postMessage")?;
        body.get("ts")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Slack approval response missing ts")
    }

    fn extract_decision(body: &Value, thread_ts: &str) -> Option<String> {
        body.get("messages")?
            .as_array()?
            .iter()
            .filter(|message| message.get("ts").and_then(Value::as_str) != Some(thread_ts))
            .filter_map(|message| message.get("text").and_then(Value::as_str))
            .filter_map(|text| text.split_whitespace().next())
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase())
            .find(|word| word == "approve" || word == "deny")
    }

    pub async fn poll_thread_reply(&self, thread_ts: &str) -> Result<String> {
        loop {
            let response = self
                .client
                .get(self.api_url("conversations.replies"))
                .bearer_auth(&self.bot_token)
                .query(&[("channel", self.channel.as_str()), ("ts", thread_ts)])
                .send()
                .await
                .context("poll Slack thread replies")?
                .error_for_status()
                .context("Slack conversations.replies rejected")?;

            let body: Value = response
                .json()
                .await
                .context("parse Slack conversations.replies response")?;
            check_ok(&body, "conversations.replies")?;

            if let Some(decision) = Self::extract_decision(&body, thread_ts) {
                return Ok(decision);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn check_ok(body: &Value, method: &str) -> Result<()> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    bail!("Slack {method} failed: {error}")
}

impl ApprovalGate for SlackApprovalGate {
    fn name(&self) -> &str {
        "slack"
    }

    fn request_approval<'a>(
        &'a self,
        request: &'a ApprovalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move {
            let thread_ts = self.send_approval_message(request).await?;
            tracing::info!(
                request_id = %request.request_id,
                channel = %self.channel,
                thread_ts = %thread_ts,
                "approval.slack.posted"
            );
            match self.poll_thread_reply(&thread_ts).await?.as_str() {
                "approve" => Ok(ApprovalDecision::approve("approved in Slack")),
                _ => Ok(ApprovalDecision::reject("denied in Slack")),
            }
        })
    }
}
