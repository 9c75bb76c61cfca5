use std::time::Duration;

use nexusops::core::tools::DRAFT_REMEDIATION_PR;
use nexusops::security::approval::{ApprovalGate, ApprovalRequest, SlackApprovalGate};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ApprovalRequest {
    ApprovalRequest::new(
        "run-1",
        "INC-5",
        3,
        DRAFT_REMEDIATION_PR,
        &json!({"repo": "nexus/app", "title": "Raise memory limits for api", "head": "h"}),
    )
}

async fn mount_post(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({"channel": "C042"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "171.1"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_replies(server: &MockServer, reply: &str) {
    Mock::given(method("GET"))
        .and(path("/conversations.replies"))
        .and(query_param("channel", "C042"))
        .and(query_param("ts", "171.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [
                {"ts": "171.1", "text": "Write action approval required"},
                {"ts": "171.2", "text": reply}
            ]
        })))
        .mount(server)
        .await;
}

fn gate(server: &MockServer) -> SlackApprovalGate {
    SlackApprovalGate::new("xoxb-test", "C042")
        .with_api_base(&server.uri())
        .with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn threaded_approve_reply_approves() {
    let server = MockServer::start().await;
    mount_post(&server).await;
    mount_replies(&server, "approve, looks right").await;

    let decision = gate(&server).request_approval(&request()).await.unwrap();
    assert!(decision.approved);
}

#[tokio::test]
async fn threaded_deny_reply_rejects() {
    let server = MockServer::start().await;
    mount_post(&server).await;
    mount_replies(&server, "deny").await;

    let decision = gate(&server).request_approval(&request()).await.unwrap();
    assert!(!decision.approved);
}

#[tokio::test]
async fn slack_api_error_surfaces_as_err() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
        )
        .mount(&server)
        .await;

    let err = gate(&server).request_approval(&request()).await.unwrap_err();
    assert!(err.to_string().contains("channel_not_found"));
}

#[tokio::test]
async fn unanswered_thread_keeps_polling() {
    let server = MockServer::start().await;
    mount_post(&server).await;
    Mock::given(method("GET"))
        .and(path("/conversations.replies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "messages": [{"ts": "171.1", "text": "Write action approval required"}]
        })))
        .mount(&server)
        .await;

    let gate = gate(&server);
    let request = request();
    let pending = tokio::time::timeout(
        Duration::from_millis(100),
        gate.request_approval(&request),
    )
    .await;
    assert!(pending.is_err());
}
