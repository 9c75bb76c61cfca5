use std::sync::Arc;

use nexusops::core::investigation::{
    ActOutcome, Incident, InvestigationState, Step, TerminationCause, Verdict,
};
use nexusops::core::policy::{DecisionPolicy, NextAction, PolicyError};
use nexusops::core::tools::DRAFT_REMEDIATION_PR;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::investigation_harness::{GateMode, HarnessBuilder, ScriptedGate};

fn incident() -> Incident {
    Incident::new("INC-7", "OOMKill in pod checkout-5d9").with_label("namespace", "shop")
}

/// Issues the same write twice, then stops.
struct RepeatWrite;

impl DecisionPolicy for RepeatWrite {
    fn name(&self) -> &str {
        "repeat-write"
    }

    fn decide(&self, state: &InvestigationState) -> Result<NextAction, PolicyError> {
        let writes = state
            .steps()
            .iter()
            .filter(|record| matches!(record.step, Step::Act { .. }))
            .count();
        if writes < 2 {
            Ok(NextAction::act(
                DRAFT_REMEDIATION_PR,
                json!({"repo": "nexus/checkout", "title": "Raise memory limits"}),
            ))
        } else {
            Ok(NextAction::terminate(Verdict::Diagnosed, "done"))
        }
    }
}

fn pr_outcome(steps: &[nexusops::core::investigation::StepRecord]) -> Option<&ActOutcome> {
    steps.iter().find_map(|record| match &record.step {
        Step::Act {
            action, outcome, ..
        } if action == DRAFT_REMEDIATION_PR => Some(outcome),
        _ => None,
    })
}

#[tokio::test]
async fn every_executed_write_action_carries_an_approval() {
    for mode in [GateMode::Approve, GateMode::Deny, GateMode::Fail] {
        let harness = HarnessBuilder::new().gate(ScriptedGate::new(mode)).build();
        let report = harness.orchestrator.investigate(incident()).await;

        for record in &report.steps {
            if let Step::Act {
                capability,
                approval,
                outcome: ActOutcome::Executed { .. },
                ..
            } = &record.step
                && capability.requires_approval()
            {
                assert!(
                    approval.as_ref().is_some_and(|d| d.approved),
                    "write step {} executed without approval under {mode:?}",
                    record.index
                );
            }
        }
    }
}

#[tokio::test]
async fn approval_request_names_the_exact_action_and_step() {
    let harness = HarnessBuilder::new().build();
    let report = harness.orchestrator.investigate(incident()).await;

    let requests = harness.gate.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.action, DRAFT_REMEDIATION_PR);
    assert_eq!(request.incident_id, "INC-7");
    assert_eq!(request.step, 3);
    assert_eq!(request.request_id, format!("{}:3", report.investigation_id));

    let Step::Act { params, .. } = &report.steps[2].step else {
        panic!("step 3 should be the PR draft");
    };
    assert_eq!(&request.params, params);
    assert_eq!(harness.pr_calls.lock().unwrap()[0], *params);
}

#[tokio::test]
async fn repeated_write_is_approved_each_time() {
    let harness = HarnessBuilder::new().policy(Arc::new(RepeatWrite)).build();
    let report = harness.orchestrator.investigate(incident()).await;

    let requests = harness.gate.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].params, requests[1].params);
    assert_eq!((requests[0].step, requests[1].step), (1, 2));
    assert_ne!(requests[0].request_id, requests[1].request_id);
    assert_eq!(harness.pr_calls.lock().unwrap().len(), 2);

    let approved = report
        .steps
        .iter()
        .filter(|record| {
            matches!(
                &record.step,
                Step::Act { approval: Some(decision), outcome: ActOutcome::Executed { .. }, .. }
                    if decision.approved
            )
        })
        .count();
    assert_eq!(approved, 2);
    assert_eq!(report.verdict, Verdict::Diagnosed);
}

#[tokio::test]
async fn silent_gate_times_out_and_fails_closed() {
    let harness = HarnessBuilder::new()
        .gate(ScriptedGate::new(GateMode::Silent))
        .build();
    let report = harness.orchestrator.investigate(incident()).await;

    match pr_outcome(&report.steps) {
        Some(ActOutcome::Blocked { reason }) => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected blocked PR, got {other:?}"),
    }
    assert!(harness.pr_calls.lock().unwrap().is_empty());
    assert_eq!(report.verdict, Verdict::Diagnosed);
}

#[tokio::test]
async fn failing_gate_counts_as_rejection() {
    let harness = HarnessBuilder::new()
        .gate(ScriptedGate::new(GateMode::Fail))
        .build();
    let report = harness.orchestrator.investigate(incident()).await;

    match pr_outcome(&report.steps) {
        Some(ActOutcome::Blocked { reason }) => {
            assert!(reason.contains("approval backend offline"), "{reason}");
        }
        other => panic!("expected blocked PR, got {other:?}"),
    }
    assert!(harness.pr_calls.lock().unwrap().is_empty());
    assert!(report.error.is_none());
}

#[tokio::test]
async fn read_only_actions_skip_the_gate() {
    // Denial blocks the PR only; the log fetch before it runs ungated.
    let harness = HarnessBuilder::new()
        .gate(ScriptedGate::new(GateMode::Deny))
        .build();
    let report = harness.orchestrator.investigate(incident()).await;

    assert_eq!(harness.fetch_calls.lock().unwrap().len(), 1);
    assert_eq!(
        harness.fetch_calls.lock().unwrap()[0],
        serde_json::json!({"pod": "checkout-5d9", "namespace": "shop"})
    );
    assert_eq!(harness.gate.requests().len(), 1);
    assert_eq!(report.steps[1].step.kind(), "act");
}

#[tokio::test]
async fn cancellation_during_approval_finishes_the_step_first() {
    let cancel = CancellationToken::new();
    let harness = HarnessBuilder::new()
        .gate(ScriptedGate::new(GateMode::Approve).cancelling(cancel.clone()))
        .build();
    let report = harness
        .orchestrator
        .investigate_with_cancel(incident(), &cancel)
        .await;

    assert_eq!(report.verdict, Verdict::Cancelled);
    assert_eq!(report.termination_cause(), Some(TerminationCause::Cancelled));
    assert_eq!(report.steps.len(), 4);
    assert!(pr_outcome(&report.steps).is_some_and(ActOutcome::is_success));
    assert_eq!(harness.pr_calls.lock().unwrap().len(), 1);
}
