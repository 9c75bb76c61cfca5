use super::traits::{DecisionPolicy, NextAction};
use crate::config::Config;
use crate::core::investigation::{ActOutcome, Incident, InvestigationState, RetrievalOutcome, Verdict};
use crate::core::retrieval::{RetrievalResult, rank_results};
use crate::core::tools::{DRAFT_REMEDIATION_PR, FETCH_LOGS, Outcome};
use crate::error::PolicyError;
use crate::utils::text::{is_stopword, search_terms, words};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Retrieval failures tolerated before the run is declared degraded.
const MAX_UNAVAILABLE_RETRIEVALS: usize = 2;
/// Log fetches attempted before giving up on diagnosis.
const MAX_FETCH_ATTEMPTS: usize = 2;
const REFORMULATION_SUFFIX: &str = "troubleshooting";
const MAX_CITED_SOURCES: usize = 3;
const FALLBACK_TARGET: &str = "the affected workload";
const EXPLICIT_FIX_TERMS: &[&str] = &["fix", "pr", "patch", "remediate", "remediation"];

/// Incident classes the rule table knows, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    OutOfMemory,
    CrashLoop,
    ImagePull,
    ErrorLogs,
}

impl Signature {
    const ALL: [Self; 4] = [
        Self::OutOfMemory,
        Self::CrashLoop,
        Self::ImagePull,
        Self::ErrorLogs,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::OutOfMemory => &["oom", "oomkill", "oomkilled", "out-of-memory", "memory"],
            Self::CrashLoop => &["crashloop", "crashloopbackoff", "crash", "crashing", "restarting"],
            Self::ImagePull => &["imagepull", "imagepullbackoff", "errimagepull", "image"],
            Self::ErrorLogs => &["error", "errors", "exception", "failing", "log", "logs", "5xx"],
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Self::OutOfMemory => "oom",
            Self::CrashLoop => "crashloop",
            Self::ImagePull => "image-pull",
            Self::ErrorLogs => "errors",
        }
    }

    fn detect(terms: &[String]) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|sig| terms.iter().any(|t| sig.keywords().contains(&t.as_str())))
            .collect()
    }

    /// Signatures whose fix is known well enough to propose unprompted.
    fn auto_remediates(self) -> bool {
        matches!(self, Self::OutOfMemory)
    }

    fn remediation_title(self, target: &str) -> String {
        match self {
            Self::OutOfMemory => format!("Raise memory limits for {target}"),
            Self::CrashLoop => format!("Fix crash loop in {target}"),
            Self::ImagePull => format!("Fix image reference for {target}"),
            Self::ErrorLogs => format!("Remediate errors in {target}"),
        }
    }
}

/// What the rule table makes of one incident. Derived from the incident
/// alone, so it is identical on every call.
struct Plan {
    signatures: Vec<Signature>,
    target: Option<String>,
    namespace: String,
    explicit_fix: bool,
}

impl Plan {
    fn for_incident(incident: &Incident) -> Self {
        let terms = search_terms(&incident.description);
        Self {
            signatures: Signature::detect(&terms),
            target: target_pod(incident),
            namespace: incident.label("namespace").unwrap_or("default").to_string(),
            explicit_fix: terms.iter().any(|t| EXPLICIT_FIX_TERMS.contains(&t.as_str())),
        }
    }

    fn primary(&self) -> Option<Signature> {
        self.signatures.first().copied()
    }

    fn wants_remediation(&self) -> bool {
        self.explicit_fix || self.primary().is_some_and(Signature::auto_remediates)
    }

    fn target_or_fallback(&self) -> &str {
        self.target.as_deref().unwrap_or(FALLBACK_TARGET)
    }
}

/// The `pod` label, else the word following "pod" in the description.
fn target_pod(incident: &Incident) -> Option<String> {
    if let Some(pod) = incident.label("pod").filter(|p| !p.is_empty()) {
        return Some(pod.to_string());
    }
    let mut tokens = words(&incident.description);
    while let Some(word) = tokens.next() {
        if word.eq_ignore_ascii_case("pod") {
            return tokens.next().map(str::to_string);
        }
    }
    None
}

/// The description with function words dropped: "OOMKill in pod X" becomes
/// "OOMKill pod X".
fn base_query(incident: &Incident) -> String {
    words(&incident.description)
        .filter(|w| !is_stopword(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn branch_slug(raw: &str) -> String {
    let slug: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn success_data(outcome: &ActOutcome) -> Option<&str> {
    match outcome {
        ActOutcome::Executed {
            outcome: Outcome::Success { data },
        } => Some(data.as_str()),
        _ => None,
    }
}

/// Deterministic keyword rule table.
///
/// Always consults the knowledge base first. With relevant knowledge in hand
/// it fetches logs for recognized failure signatures and drafts a remediation
/// PR for known fixes or when the incident asks for one. Each step of that
/// plan is attempted a bounded number of times.
#[derive(Debug, Clone)]
pub struct RuleBasedPolicy {
    relevance_threshold: f64,
    remediation_repo: String,
    base_branch: String,
}

impl RuleBasedPolicy {
    pub fn new(relevance_threshold: f64) -> Self {
        let relevance_threshold = if relevance_threshold.is_nan() {
            0.5
        } else {
            relevance_threshold.clamp(0.0, 1.0)
        };
        Self {
            relevance_threshold,
            remediation_repo: "nexus/app".into(),
            base_branch: "main".into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.investigation.relevance_threshold).with_remediation_target(
            config.actions.remediation_repo.clone(),
            config.actions.base_branch.clone(),
        )
    }

    #[must_use]
    pub fn with_remediation_target(
        mut self,
        repo: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        self.remediation_repo = repo.into();
        self.base_branch = base_branch.into();
        self
    }

    pub fn relevance_threshold(&self) -> f64 {
        self.relevance_threshold
    }

    fn relevant_knowledge(&self, state: &InvestigationState) -> Vec<RetrievalResult> {
        let mut seen = BTreeSet::new();
        let mut relevant: Vec<RetrievalResult> = state
            .retrievals()
            .filter_map(|(_, outcome)| match outcome {
                RetrievalOutcome::Results { results } => Some(results),
                RetrievalOutcome::Unavailable { .. } => None,
            })
            .flatten()
            .filter(|r| r.score >= self.relevance_threshold)
            .cloned()
            .collect();
        rank_results(&mut relevant);
        relevant.retain(|r| seen.insert(r.source.clone()));
        relevant
    }

    fn reformulate(incident: &Incident, base: &str) -> String {
        let plan = Plan::for_incident(incident);
        let mut parts: Vec<String> = if plan.signatures.is_empty() {
            vec![base.to_string()]
        } else {
            plan.signatures.iter().map(|s| s.slug().to_string()).collect()
        };
        for value in incident.labels.values() {
            if !parts.contains(value) {
                parts.push(value.clone());
            }
        }
        if let Some(target) = plan.target
            && !parts.contains(&target)
        {
            parts.push(target);
        }
        parts.push(REFORMULATION_SUFFIX.to_string());
        parts.join(" ")
    }

    /// No relevant knowledge yet: retry after outages, reformulate once after
    /// weak results, then give up.
    fn seek_knowledge(&self, state: &InvestigationState, base: &str) -> NextAction {
        let Some((last_query, last_outcome)) = state.retrievals().last() else {
            return NextAction::retrieve(base);
        };

        match last_outcome {
            RetrievalOutcome::Unavailable { reason } => {
                let failures = state
                    .retrievals()
                    .filter(|(_, o)| matches!(o, RetrievalOutcome::Unavailable { .. }))
                    .count();
                if failures >= MAX_UNAVAILABLE_RETRIEVALS {
                    NextAction::terminate(
                        Verdict::Degraded,
                        format!("knowledge retrieval unavailable after {failures} attempts: {reason}"),
                    )
                } else {
                    NextAction::retrieve(last_query)
                }
            }
            RetrievalOutcome::Results { .. } => {
                let reformulated = Self::reformulate(state.incident(), base);
                if state.retrievals().any(|(q, _)| q == reformulated) {
                    NextAction::terminate(
                        Verdict::Inconclusive,
                        format!(
                            "no knowledge scored at or above {} for '{base}'",
                            self.relevance_threshold
                        ),
                    )
                } else {
                    NextAction::retrieve(reformulated)
                }
            }
        }
    }

    fn fetch_params(plan: &Plan, target: &str) -> Value {
        json!({ "pod": target, "namespace": plan.namespace })
    }

    /// `None` once logs are in hand; otherwise the next diagnostic move.
    fn diagnose(&self, state: &InvestigationState, plan: &Plan) -> Option<NextAction> {
        let target = plan.target.as_deref()?;
        plan.primary()?;

        let attempts: Vec<(&Value, &ActOutcome)> = state.attempts(FETCH_LOGS).collect();
        let params = Self::fetch_params(plan, target);
        let Some(&(last_params, last_outcome)) = attempts.last() else {
            return Some(NextAction::act(FETCH_LOGS, params));
        };

        if last_outcome.is_success() {
            return None;
        }
        let reason = last_outcome.failure_reason().unwrap_or("unknown failure");
        if last_outcome.is_blocked() {
            return Some(NextAction::terminate(
                Verdict::Inconclusive,
                format!("log fetch for {target} was blocked: {reason}"),
            ));
        }

        let repeated = attempts[..attempts.len() - 1]
            .iter()
            .any(|&(p, o)| p == last_params && o == last_outcome);
        if repeated {
            return Some(NextAction::stuck_loop(format!(
                "{FETCH_LOGS} for {target} repeated with identical outcome: {reason}"
            )));
        }
        if attempts.len() >= MAX_FETCH_ATTEMPTS {
            return Some(NextAction::terminate(
                Verdict::Inconclusive,
                format!("could not fetch logs for {target}: {reason}"),
            ));
        }
        Some(NextAction::act(FETCH_LOGS, params))
    }

    fn remediation_params(
        &self,
        state: &InvestigationState,
        plan: &Plan,
        knowledge: &[RetrievalResult],
    ) -> Value {
        let incident = state.incident();
        let target = plan.target_or_fallback();
        let title = match plan.primary() {
            Some(signature) => signature.remediation_title(target),
            None => format!("Remediate incident {}", incident.id),
        };
        let logs_fetched = state
            .attempts(FETCH_LOGS)
            .any(|(_, outcome)| outcome.is_success());

        let mut body = format!(
            "Incident {}: {}\n\nTarget: {target}\nNamespace: {}\nLogs fetched: {}\n\nSupporting knowledge:\n",
            incident.id,
            incident.description,
            plan.namespace,
            if logs_fetched { "yes" } else { "no" },
        );
        for result in knowledge.iter().take(MAX_CITED_SOURCES) {
            let _ = writeln!(body, "- {} (score {:.2})", result.source, result.score);
        }

        let head = format!(
            "nexusops/{}-{}",
            branch_slug(&incident.id),
            plan.primary().map_or("fix", Signature::slug)
        );
        json!({
            "repo": self.remediation_repo,
            "title": title,
            "body": body,
            "head": head,
            "base": self.base_branch,
        })
    }

    fn remediate(
        &self,
        state: &InvestigationState,
        plan: &Plan,
        knowledge: &[RetrievalResult],
    ) -> NextAction {
        let Some((_, outcome)) = state.attempts(DRAFT_REMEDIATION_PR).last() else {
            return NextAction::act(
                DRAFT_REMEDIATION_PR,
                self.remediation_params(state, plan, knowledge),
            );
        };
        if let ActOutcome::Executed {
            outcome: Outcome::DryRun { preview },
        } = outcome
        {
            return NextAction::terminate(
                Verdict::Diagnosed,
                format!("remediation not applied (dry run): {preview}"),
            );
        }
        match success_data(outcome) {
            Some(data) => NextAction::terminate(Verdict::Resolved, format!("remediation drafted: {data}")),
            None => {
                let reason = outcome.failure_reason().unwrap_or("unknown failure");
                let what = if outcome.is_blocked() { "blocked" } else { "failed" };
                NextAction::terminate(Verdict::Diagnosed, format!("remediation {what}: {reason}"))
            }
        }
    }

    fn conclude(plan: &Plan, knowledge: &[RetrievalResult]) -> NextAction {
        let sources = knowledge
            .iter()
            .take(MAX_CITED_SOURCES)
            .map(|r| r.source.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let summary = match plan.primary() {
            Some(signature) => format!(
                "{} on {} matches runbooks: {sources}",
                signature.slug(),
                plan.target_or_fallback()
            ),
            None => format!("relevant runbooks: {sources}"),
        };
        NextAction::terminate(Verdict::Diagnosed, summary)
    }
}

impl DecisionPolicy for RuleBasedPolicy {
    fn name(&self) -> &str {
        "rules"
    }

    fn decide(&self, state: &InvestigationState) -> Result<NextAction, PolicyError> {
        let incident = state.incident();
        let base = base_query(incident);
        if base.is_empty() {
            return Err(PolicyError::InvalidDecision(format!(
                "incident '{}' has no searchable description",
                incident.id
            )));
        }

        let knowledge = self.relevant_knowledge(state);
        if knowledge.is_empty() {
            return Ok(self.seek_knowledge(state, &base));
        }

        let plan = Plan::for_incident(incident);
        if let Some(next) = self.diagnose(state, &plan) {
            return Ok(next);
        }
        if plan.wants_remediation() {
            return Ok(self.remediate(state, &plan, &knowledge));
        }
        Ok(Self::conclude(&plan, &knowledge))
    }
}
