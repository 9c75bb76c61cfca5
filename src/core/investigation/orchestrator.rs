use super::clock::{Clock, SystemClock};
use super::types::{
    ActOutcome, Incident, InvestigationReport, InvestigationState, OrchestratorSettings,
    ReportError, RetrievalOutcome, Step, TerminationCause, Verdict,
};
use crate::core::policy::{DecisionPolicy, NextAction};
use crate::core::retrieval::{Retriever, top_k};
use crate::core::tools::ActionRegistry;
use crate::error::{InvestigationError, PolicyError};
use crate::runtime::observability::{NoopObserver, Observer, ObserverEvent};
use crate::security::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Phase {
    Init,
    Deciding,
    Retrieving,
    Acting,
    AwaitingApproval,
    Terminated,
}

/// Drives one bounded investigation loop per call.
///
/// Collaborators are injected at construction and shared read-only, so one
/// orchestrator can run any number of investigations concurrently; each run
/// owns its own [`InvestigationState`].
pub struct Orchestrator {
    policy: Arc<dyn DecisionPolicy>,
    retriever: Arc<dyn Retriever>,
    registry: Arc<ActionRegistry>,
    gate: Arc<dyn ApprovalGate>,
    observer: Arc<dyn Observer>,
    clock: Arc<dyn Clock>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        policy: Arc<dyn DecisionPolicy>,
        retriever: Arc<dyn Retriever>,
        registry: Arc<ActionRegistry>,
        gate: Arc<dyn ApprovalGate>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            policy,
            retriever,
            registry,
            gate,
            observer: Arc::new(NoopObserver),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub async fn investigate(&self, incident: Incident) -> InvestigationReport {
        self.investigate_with_cancel(incident, &CancellationToken::new())
            .await
    }

    /// Runs to a verdict. Cancellation is honored between steps only; a step
    /// in flight always completes and is recorded first.
    pub async fn investigate_with_cancel(
        &self,
        incident: Incident,
        cancel: &CancellationToken,
    ) -> InvestigationReport {
        let investigation_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let started_at = self.clock.now();
        let mut state = InvestigationState::new(incident);
        let mut error: Option<ReportError> = None;

        self.enter(&state, Phase::Init);
        info!(
            investigation_id = %investigation_id,
            incident_id = %state.incident().id,
            max_steps = self.settings.max_steps,
            "investigation started"
        );
        self.observer.record_event(&ObserverEvent::InvestigationStart {
            investigation_id: investigation_id.clone(),
            incident_id: state.incident().id.clone(),
        });

        while !state.is_terminated() {
            if cancel.is_cancelled() {
                self.record(
                    &mut state,
                    Step::Terminate {
                        verdict: Verdict::Cancelled,
                        cause: TerminationCause::Cancelled,
                        summary: "investigation cancelled".into(),
                    },
                );
                break;
            }

            self.enter(&state, Phase::Deciding);
            let next = match self.policy.decide(&state) {
                Ok(next) => next,
                Err(e) => {
                    error = Some(self.abort(&mut state, &e.into()));
                    break;
                }
            };

            match next {
                NextAction::Terminate {
                    verdict,
                    cause,
                    summary,
                } => self.record(
                    &mut state,
                    Step::Terminate {
                        verdict,
                        cause,
                        summary,
                    },
                ),
                // The last slot of the log is reserved for the terminating step.
                _ if state.iteration() + 1 >= self.settings.max_steps => self.record(
                    &mut state,
                    Step::Terminate {
                        verdict: Verdict::Inconclusive,
                        cause: TerminationCause::BudgetExhausted,
                        summary: format!(
                            "step budget of {} exhausted before a verdict",
                            self.settings.max_steps
                        ),
                    },
                ),
                NextAction::Retrieve { query } => {
                    self.enter(&state, Phase::Retrieving);
                    let step = self.retrieve(query).await;
                    self.record(&mut state, step);
                }
                NextAction::Act { name, params } => {
                    match self.act(&state, &investigation_id, name, params).await {
                        Ok(step) => self.record(&mut state, step),
                        Err(e) => {
                            error = Some(self.abort(&mut state, &e));
                            break;
                        }
                    }
                }
            }
        }

        self.enter(&state, Phase::Terminated);
        let verdict = state.verdict().unwrap_or(Verdict::Errored);
        let total_steps = state.iteration();
        info!(
            investigation_id = %investigation_id,
            incident_id = %state.incident().id,
            verdict = %verdict,
            total_steps,
            "investigation finished"
        );
        self.observer.record_event(&ObserverEvent::InvestigationEnd {
            incident_id: state.incident().id.clone(),
            verdict: verdict.to_string(),
            total_steps,
            duration: started.elapsed(),
        });

        let incident = state.incident().clone();
        InvestigationReport {
            investigation_id,
            incident,
            steps: state.into_steps(),
            verdict,
            total_steps,
            error,
            started_at,
            finished_at: self.clock.now(),
        }
    }

    fn enter(&self, state: &InvestigationState, phase: Phase) {
        debug!(
            incident_id = %state.incident().id,
            step = state.iteration(),
            phase = %phase,
            "investigation phase"
        );
    }

    fn record(&self, state: &mut InvestigationState, step: Step) {
        let kind = step.kind();
        let detail = step.describe();
        let Some(record) = state.append(step, self.clock.now()) else {
            return;
        };
        let index = record.index;
        info!(
            incident_id = %state.incident().id,
            step = index,
            kind,
            detail = %detail,
            "step recorded"
        );
        self.observer.record_event(&ObserverEvent::StepRecorded {
            incident_id: state.incident().id.clone(),
            step: index,
            kind: kind.to_string(),
            detail,
        });
    }

    /// Records the fatal error as the terminating step and returns the error
    /// for the report.
    fn abort(&self, state: &mut InvestigationState, err: &InvestigationError) -> ReportError {
        error!(
            incident_id = %state.incident().id,
            step = state.iteration(),
            kind = err.kind(),
            error = %err,
            "investigation aborted"
        );
        self.observer.record_event(&ObserverEvent::Error {
            component: "orchestrator".into(),
            message: err.to_string(),
        });
        self.record(
            state,
            Step::Terminate {
                verdict: Verdict::Errored,
                cause: TerminationCause::Fatal,
                summary: err.to_string(),
            },
        );
        ReportError::from(err)
    }

    async fn retrieve(&self, query: String) -> Step {
        let k = self.settings.retrieval_k;
        match self.retriever.search(&query, k).await {
            Ok(results) => Step::Retrieve {
                query,
                outcome: RetrievalOutcome::Results {
                    results: top_k(results, k),
                },
            },
            Err(e) => {
                warn!(retriever = self.retriever.name(), query = %query, error = %e, "retrieval failed");
                Step::Retrieve {
                    query,
                    outcome: RetrievalOutcome::Unavailable {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    async fn act(
        &self,
        state: &InvestigationState,
        investigation_id: &str,
        name: String,
        params: Value,
    ) -> Result<Step, InvestigationError> {
        let capability = self
            .registry
            .resolve(&name)
            .map_err(|_| PolicyError::UnknownAction { name: name.clone() })?
            .capability;

        let approval = if capability.requires_approval() {
            self.enter(state, Phase::AwaitingApproval);
            let request = ApprovalRequest::new(
                investigation_id,
                &state.incident().id,
                state.iteration() + 1,
                &name,
                &params,
            );
            let decision = self.await_approval(&request).await;
            if !decision.approved {
                return Ok(Step::Act {
                    action: name,
                    params,
                    capability,
                    outcome: ActOutcome::Blocked {
                        reason: decision.reason.clone(),
                    },
                    approval: Some(decision),
                });
            }
            Some(decision)
        } else {
            None
        };

        self.enter(state, Phase::Acting);
        let outcome = self.registry.invoke(&name, &params).await?;
        Ok(Step::Act {
            action: name,
            params,
            capability,
            approval,
            outcome: ActOutcome::Executed { outcome },
        })
    }

    /// Blocks the run until the gate answers or the timeout fires. Anything
    /// but an explicit approval is a rejection.
    async fn await_approval(&self, request: &ApprovalRequest) -> ApprovalDecision {
        self.observer.record_event(&ObserverEvent::ApprovalRequested {
            incident_id: request.incident_id.clone(),
            step: request.step,
            action: request.action.clone(),
        });

        let timeout = self.settings.approval_timeout;
        let decision =
            match tokio::time::timeout(timeout, self.gate.request_approval(request)).await {
                Ok(Ok(decision)) => decision,
                Ok(Err(e)) => {
                    warn!(gate = self.gate.name(), request_id = %request.request_id, error = %e, "approval gate failed");
                    ApprovalDecision::reject(format!("approval gate error: {e:#}"))
                }
                Err(_) => ApprovalDecision::timed_out(timeout),
            };

        info!(
            request_id = %request.request_id,
            action = %request.action,
            approved = decision.approved,
            reason = %decision.reason,
            "approval resolved"
        );
        self.observer.record_event(&ObserverEvent::ApprovalResolved {
            incident_id: request.incident_id.clone(),
            step: request.step,
            action: request.action.clone(),
            approved: decision.approved,
            reason: decision.reason.clone(),
        });
        decision
    }
}
