use nexusops::core::investigation::{
    ActOutcome, Incident, RetrievalOutcome, Step, TerminationCause, Verdict,
};
use nexusops::core::tools::{Capability, DRAFT_REMEDIATION_PR, FETCH_LOGS, Outcome};

use super::investigation_harness::{GateMode, HarnessBuilder, ScriptedGate, ScriptedRetriever};

fn oom_incident() -> Incident {
    Incident::new("INC-1042", "OOMKill in pod X")
}

#[tokio::test]
async fn oom_incident_is_resolved_through_approved_pr() {
    let harness = HarnessBuilder::new().build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Resolved);
    assert_eq!(report.total_steps, 4);
    assert_eq!(report.steps.len(), 4);
    assert!(report.error.is_none());

    match &report.steps[0].step {
        Step::Retrieve {
            query,
            outcome: RetrievalOutcome::Results { results },
        } => {
            assert_eq!(query, "OOMKill pod X");
            assert_eq!(results.len(), 2);
        }
        other => panic!("expected retrieve, got {other:?}"),
    }
    match &report.steps[1].step {
        Step::Act {
            action,
            capability,
            approval,
            outcome,
            ..
        } => {
            assert_eq!(action, FETCH_LOGS);
            assert_eq!(*capability, Capability::ReadOnly);
            assert!(approval.is_none());
            assert!(outcome.is_success());
        }
        other => panic!("expected fetch_logs, got {other:?}"),
    }
    match &report.steps[2].step {
        Step::Act {
            action,
            capability,
            approval,
            outcome,
            ..
        } => {
            assert_eq!(action, DRAFT_REMEDIATION_PR);
            assert_eq!(*capability, Capability::Write);
            assert!(approval.as_ref().is_some_and(|d| d.approved));
            assert!(outcome.is_success());
        }
        other => panic!("expected draft_remediation_pr, got {other:?}"),
    }
    assert_eq!(report.termination_cause(), Some(TerminationCause::PolicyVerdict));

    assert_eq!(harness.fetch_calls.lock().unwrap().len(), 1);
    let pr_calls = harness.pr_calls.lock().unwrap();
    assert_eq!(pr_calls.len(), 1);
    assert_eq!(pr_calls[0]["head"], "nexusops/inc-1042-oom");
    assert_eq!(pr_calls[0]["title"], "Raise memory limits for X");
}

#[tokio::test]
async fn denied_pr_is_recorded_blocked_and_never_invoked() {
    let harness = HarnessBuilder::new()
        .gate(ScriptedGate::new(GateMode::Deny))
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_ne!(report.verdict, Verdict::Resolved);
    assert_eq!(report.verdict, Verdict::Diagnosed);
    assert!(harness.pr_calls.lock().unwrap().is_empty());

    let blocked = report
        .steps
        .iter()
        .find_map(|record| match &record.step {
            Step::Act {
                action, outcome, ..
            } if action == DRAFT_REMEDIATION_PR => Some(outcome),
            _ => None,
        })
        .expect("PR step recorded");
    assert_eq!(
        blocked,
        &ActOutcome::Blocked {
            reason: "denied in test".into()
        }
    );
    assert_eq!(harness.gate.requests().len(), 1);
}

#[tokio::test]
async fn empty_retrieval_reformulates_once_then_is_inconclusive() {
    let harness = HarnessBuilder::new()
        .retriever(ScriptedRetriever::empty())
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Inconclusive);
    let retrieves = report
        .steps
        .iter()
        .filter(|record| matches!(record.step, Step::Retrieve { .. }))
        .count();
    assert_eq!(retrieves, 2);
    assert_eq!(report.steps.len(), 3);

    let queries = harness.retriever.queries();
    assert_eq!(queries.len(), 2);
    assert_ne!(queries[0], queries[1]);
    assert!(harness.fetch_calls.lock().unwrap().is_empty());
}

fn flaky_retriever() -> ScriptedRetriever {
    ScriptedRetriever::always(super::investigation_harness::oom_runbooks()).then(Err(
        nexusops::error::RetrievalError::Unavailable("timeout".into()),
    ))
}

#[tokio::test]
async fn budget_of_three_force_terminates_at_step_three() {
    // Unbudgeted, this run takes five steps: outage, retry, logs, PR, verdict.
    let harness = HarnessBuilder::new()
        .retriever(flaky_retriever())
        .max_steps(3)
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.total_steps, 3);
    assert_eq!(report.verdict, Verdict::Inconclusive);
    assert_eq!(report.termination_cause(), Some(TerminationCause::BudgetExhausted));
    assert!(matches!(
        report.steps[0].step,
        Step::Retrieve {
            outcome: RetrievalOutcome::Unavailable { .. },
            ..
        }
    ));
    assert!(matches!(
        report.steps[1].step,
        Step::Retrieve {
            outcome: RetrievalOutcome::Results { .. },
            ..
        }
    ));
    assert!(matches!(report.steps[2].step, Step::Terminate { .. }));
    assert!(harness.fetch_calls.lock().unwrap().is_empty());
    assert!(harness.gate.requests().is_empty());
    assert!(harness.pr_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retrieval_outage_degrades_without_aborting() {
    let harness = HarnessBuilder::new()
        .retriever(ScriptedRetriever::unavailable())
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Degraded);
    assert!(report.error.is_none());
    assert!(matches!(
        report.steps[0].step,
        Step::Retrieve {
            outcome: RetrievalOutcome::Unavailable { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn transient_outage_recovers_on_retry() {
    let harness = HarnessBuilder::new().retriever(flaky_retriever()).build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Resolved);
    assert_eq!(report.steps.len(), 5);
}

#[tokio::test]
async fn repeated_identical_fetch_failure_is_a_stuck_loop() {
    let harness = HarnessBuilder::new()
        .fetch_outcome(Outcome::failure("pods \"X\" not found"))
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Inconclusive);
    assert_eq!(report.termination_cause(), Some(TerminationCause::StuckLoop));
    assert_eq!(harness.fetch_calls.lock().unwrap().len(), 2);
    assert!(harness.pr_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_pr_is_data_not_a_fatal_error() {
    let harness = HarnessBuilder::new()
        .pr_outcome(Outcome::failure("GitHub returned 422"))
        .build();
    let report = harness.orchestrator.investigate(oom_incident()).await;

    assert_eq!(report.verdict, Verdict::Diagnosed);
    assert!(report.error.is_none());
    assert_eq!(harness.pr_calls.lock().unwrap().len(), 1);
    assert!(report.summary().is_some_and(|s| s.contains("GitHub returned 422")));
}

#[tokio::test]
async fn unsearchable_incident_aborts_with_policy_error() {
    let harness = HarnessBuilder::new().build();
    let report = harness
        .orchestrator
        .investigate(Incident::new("INC-0", ""))
        .await;

    assert_eq!(report.verdict, Verdict::Errored);
    assert_eq!(report.termination_cause(), Some(TerminationCause::Fatal));
    assert_eq!(report.steps.len(), 1);
    let error = report.error.expect("error attached");
    assert_eq!(error.kind, "policy_error");
    assert!(harness.retriever.queries().is_empty());
}
