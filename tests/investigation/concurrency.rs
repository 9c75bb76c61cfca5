use nexusops::core::investigation::{Incident, Step, Verdict};
use nexusops::core::tools::FETCH_LOGS;

use super::investigation_harness::HarnessBuilder;

#[tokio::test]
async fn concurrent_investigations_keep_separate_state() {
    let harness = HarnessBuilder::new().build();
    let incidents: Vec<Incident> = (0..8)
        .map(|i| Incident::new(format!("INC-{i}"), format!("OOMKill in pod worker-{i}")))
        .collect();

    let reports = futures_util::future::join_all(
        incidents
            .into_iter()
            .map(|incident| harness.orchestrator.investigate(incident)),
    )
    .await;

    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.incident.id, format!("INC-{i}"));
        assert_eq!(report.verdict, Verdict::Resolved);
        assert_eq!(report.steps.len(), 4);
        let fetched_pod = report.steps.iter().find_map(|record| match &record.step {
            Step::Act { action, params, .. } if action == FETCH_LOGS => {
                params["pod"].as_str().map(str::to_string)
            }
            _ => None,
        });
        assert_eq!(fetched_pod, Some(format!("worker-{i}")));
    }

    let mut ids: Vec<&str> = reports.iter().map(|r| r.investigation_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(harness.fetch_calls.lock().unwrap().len(), 8);
    assert_eq!(harness.pr_calls.lock().unwrap().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_on_multi_thread_runtime() {
    let harness = std::sync::Arc::new(HarnessBuilder::new().build());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let harness = std::sync::Arc::clone(&harness);
            tokio::spawn(async move {
                harness
                    .orchestrator
                    .investigate(Incident::new(format!("INC-{i}"), "OOMKill in pod api"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.verdict, Verdict::Resolved);
    }
}
