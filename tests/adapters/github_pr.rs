use nexusops::core::tools::{Action, DraftRemediationPrAction, Outcome};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params() -> Value {
    json!({
        "repo": "nexus/app",
        "title": "Raise memory limits for api",
        "body": "Incident INC-1",
        "head": "nexusops/inc-1-oom",
        "base": "main"
    })
}

#[tokio::test]
async fn opens_draft_pull_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/nexus/app/pulls"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(body_partial_json(json!({
            "head": "nexusops/inc-1-oom",
            "base": "main",
            "draft": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 17,
            "html_url": "https://github.com/nexus/app/pull/17"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let action = DraftRemediationPrAction::new(server.uri(), Some("ghp_test".into()));
    let outcome = action.invoke(&params()).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::success("drafted PR #17 on nexus/app: https://github.com/nexus/app/pull/17")
    );
}

#[tokio::test]
async fn api_rejection_is_a_failure_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/nexus/app/pulls"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Validation Failed"})),
        )
        .mount(&server)
        .await;

    let action = DraftRemediationPrAction::new(server.uri(), Some("ghp_test".into()));
    match action.invoke(&params()).await.unwrap() {
        Outcome::Failure { reason } => {
            assert!(reason.contains("422"), "{reason}");
            assert!(reason.contains("Validation Failed"), "{reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn no_token_runs_dry_without_calling_github() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let action = DraftRemediationPrAction::new(server.uri(), None);
    assert!(action.is_dry_run());
    match action.invoke(&params()).await.unwrap() {
        Outcome::DryRun { preview } => assert!(preview.starts_with("[dry-run]"), "{preview}"),
        other => panic!("expected dry run, got {other:?}"),
    }
}
