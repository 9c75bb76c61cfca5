use std::sync::Arc;

use nexusops::core::investigation::{
    Incident, InvestigationState, MAX_STEPS_HARD_CAP, Step, TerminationCause, Verdict,
};
use nexusops::core::policy::{DecisionPolicy, NextAction};
use nexusops::error::PolicyError;
use tokio_util::sync::CancellationToken;

use super::investigation_harness::{GateMode, HarnessBuilder, ScriptedGate, ScriptedRetriever};

/// Never reaches a verdict on its own.
struct Relentless;

impl DecisionPolicy for Relentless {
    fn name(&self) -> &str {
        "relentless"
    }

    fn decide(&self, state: &InvestigationState) -> Result<NextAction, PolicyError> {
        Ok(NextAction::retrieve(format!("attempt {}", state.iteration())))
    }
}

fn incident() -> Incident {
    Incident::new("INC-9", "OOMKill in pod api-7")
}

fn assert_single_trailing_terminate(steps: &[nexusops::core::investigation::StepRecord]) {
    let terminates = steps
        .iter()
        .filter(|record| matches!(record.step, Step::Terminate { .. }))
        .count();
    assert_eq!(terminates, 1);
    assert!(matches!(
        steps.last().map(|record| &record.step),
        Some(Step::Terminate { .. })
    ));
    for (record, expected) in steps.iter().zip(1..) {
        assert_eq!(record.index, expected);
    }
}

#[tokio::test]
async fn step_count_never_exceeds_budget() {
    for max_steps in 1..=10 {
        let harness = HarnessBuilder::new()
            .policy(Arc::new(Relentless))
            .max_steps(max_steps)
            .build();
        let report = harness.orchestrator.investigate(incident()).await;

        assert_eq!(report.total_steps, max_steps);
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert_single_trailing_terminate(&report.steps);
    }
}

#[tokio::test]
async fn rule_policy_stays_within_every_budget() {
    for max_steps in 1..=6 {
        for mode in [GateMode::Approve, GateMode::Deny] {
            let harness = HarnessBuilder::new()
                .gate(ScriptedGate::new(mode))
                .max_steps(max_steps)
                .build();
            let report = harness.orchestrator.investigate(incident()).await;

            assert!(report.total_steps <= max_steps);
            assert_eq!(report.total_steps as usize, report.steps.len());
            assert_single_trailing_terminate(&report.steps);
        }
    }
}

#[tokio::test]
async fn configured_budget_is_capped() {
    let harness = HarnessBuilder::new()
        .policy(Arc::new(Relentless))
        .max_steps(10_000)
        .build();
    assert_eq!(harness.orchestrator.settings().max_steps, MAX_STEPS_HARD_CAP);

    let report = harness.orchestrator.investigate(incident()).await;
    assert_eq!(report.total_steps, MAX_STEPS_HARD_CAP);
    assert_eq!(report.termination_cause(), Some(TerminationCause::BudgetExhausted));
}

#[tokio::test]
async fn identical_inputs_replay_identical_step_logs() {
    let mut logs = Vec::new();
    for _ in 0..2 {
        let harness = HarnessBuilder::new()
            .gate(ScriptedGate::new(GateMode::Deny))
            .build();
        let report = harness.orchestrator.investigate(incident()).await;
        logs.push(serde_json::to_string(&report.steps).unwrap());
    }
    assert_eq!(logs[0], logs[1]);

    let mut empty_logs = Vec::new();
    for _ in 0..2 {
        let harness = HarnessBuilder::new()
            .retriever(ScriptedRetriever::empty())
            .build();
        let report = harness.orchestrator.investigate(incident()).await;
        empty_logs.push(serde_json::to_string(&report.steps).unwrap());
    }
    assert_eq!(empty_logs[0], empty_logs[1]);
}

#[tokio::test]
async fn cancelled_before_start_records_only_terminate() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let harness = HarnessBuilder::new().build();
    let report = harness
        .orchestrator
        .investigate_with_cancel(incident(), &cancel)
        .await;

    assert_eq!(report.verdict, Verdict::Cancelled);
    assert_eq!(report.steps.len(), 1);
    assert!(harness.retriever.queries().is_empty());
}

#[tokio::test]
async fn report_round_trips_through_json() {
    let harness = HarnessBuilder::new().build();
    let report = harness.orchestrator.investigate(incident()).await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["verdict"], "Resolved");
    assert_eq!(json["steps"][0]["kind"], "retrieve");
    assert_eq!(json["steps"][2]["approval"]["approved"], true);
    assert!(json.get("error").is_none());

    let back: nexusops::core::investigation::InvestigationReport =
        serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}
