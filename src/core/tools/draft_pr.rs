use super::traits::{Action, Capability, Outcome};
use anyhow::Context;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DRAFT_REMEDIATION_PR: &str = "draft_remediation_pr";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("nexusops/", env!("CARGO_PKG_VERSION"));

/// Write action: open a draft pull request carrying a proposed remediation.
///
/// Without a token the action runs dry and only reports the pull request it
/// would have opened.
pub struct DraftRemediationPrAction {
    api_base: String,
    token: Option<String>,
    client: reqwest::Client,
}

struct PrRequest<'a> {
    repo: &'a str,
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

impl<'a> PrRequest<'a> {
    fn from_params(params: &'a Value) -> Result<Self, String> {
        let field = |key: &str| params.get(key).and_then(Value::as_str).unwrap_or("");
        let request = Self {
            repo: field("repo"),
            title: field("title"),
            body: field("body"),
            head: field("head"),
            base: params
                .get("base")
                .and_then(Value::as_str)
                .unwrap_or("main"),
        };
        if request.repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(format!(
                "invalid repo '{}': expected 'owner/name'",
                request.repo
            ));
        }
        if request.title.trim().is_empty() || request.head.trim().is_empty() {
            return Err("title and head must not be empty".to_string());
        }
        Ok(request)
    }
}

impl DraftRemediationPrAction {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        }
    }

    pub const fn is_dry_run(&self) -> bool {
        self.token.is_none()
    }

    async fn create_pull(&self, token: &str, pr: &PrRequest<'_>) -> anyhow::Result<Outcome> {
        let url = format!("{}/repos/{}/pulls", self.api_base, pr.repo);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .json(&json!({
                "title": pr.title,
                "body": pr.body,
                "head": pr.head,
                "base": pr.base,
                "draft": true,
            }))
            .send()
            .await
            .context("send GitHub create pull request")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("parse GitHub pull request response")?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Ok(Outcome::failure(format!(
                "GitHub API returned {status}: {message}"
            )));
        }

        let number = body.get("number").and_then(Value::as_u64).unwrap_or(0);
        let html_url = body.get("html_url").and_then(Value::as_str).unwrap_or("");
        Ok(Outcome::success(format!(
            "drafted PR #{number} on {}: {html_url}",
            pr.repo
        )))
    }
}

impl Action for DraftRemediationPrAction {
    fn name(&self) -> &str {
        DRAFT_REMEDIATION_PR
    }

    fn description(&self) -> &str {
        "Open a draft pull request with a proposed remediation"
    }

    fn capability(&self) -> Capability {
        Capability::Write
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repo": { "type": "string", "description": "Repository in 'owner/name' form" },
                "title": { "type": "string", "description": "Title of the pull request" },
                "body": { "type": "string", "description": "Description of the remediation" },
                "head": { "type": "string", "description": "Branch carrying the changes" },
                "base": { "type": "string", "description": "Branch to merge into", "default": "main" }
            },
            "required": ["repo", "title", "body", "head"]
        })
    }

    fn invoke<'a>(
        &'a self,
        params: &'a Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Outcome>> + Send + 'a>> {
        Box::pin(async move {
            let pr = match PrRequest::from_params(params) {
                Ok(pr) => pr,
                Err(reason) => return Ok(Outcome::failure(reason)),
            };

            match self.token.as_deref() {
                Some(token) => self.create_pull(token, &pr).await,
                None => Ok(Outcome::dry_run(format!(
                    "[dry-run] would draft PR '{}' on {} from {} into {} (no GitHub token configured)",
                    pr.title, pr.repo, pr.head, pr.base
                ))),
            }
        })
    }
}
