mod common;

use academy_core::domain::InterviewStatus;
use academy_core::ports::DatabaseService;
use axum::http::{Method, StatusCode};
use common::{json_request, test_config, TestApp, ASSISTANT_ID, WEBHOOK_SECRET};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use uuid::Uuid;

fn report(student_id: Value, call_id: &str, transcript: &str) -> Value {
    json!({
        "message": {
            "type": "end-of-call-report",
            "call": { "id": call_id, "metadata": { "studentId": student_id } },
            "artifact": { "transcript": transcript, "recordingUrl": "https://rec.test/1.wav" },
            "analysis": { "summary": "Discussed REST and SQL." },
            "durationSeconds": 312.4
        }
    })
}

async fn deliver(app: &TestApp, body: Value, secret: Option<&str>) -> (StatusCode, Value) {
    let mut request = json_request(Method::POST, "/api/voice/vapi-webhook", body);
    if let Some(secret) = secret {
        request
            .headers_mut()
            .insert("x-vapi-secret", secret.parse().unwrap());
    }
    app.send(request).await
}

#[tokio::test]
async fn start_returns_agent_parameters() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    let (status, body) = app
        .post("/api/voice/start-interview", json!({ "studentId": student }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assistantId"], ASSISTANT_ID);
    assert_eq!(body["webhookUrl"], "https://api.academy.test/api/voice/vapi-webhook");
    assert_eq!(body["metadata"]["studentId"], student.to_string());
    assert_eq!(body["attemptsUsed"], 1);
    assert_eq!(body["attemptsRemaining"], 2);
}

#[tokio::test]
async fn fourth_start_on_the_same_day_is_rate_limited() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    for _ in 0..3 {
        let (status, _) = app
            .post("/api/voice/start-interview", json!({ "studentId": student }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app
        .post("/api/voice/start-interview", json!({ "studentId": student }))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["type"], "rateLimited");

    // Other students keep their own allowance.
    let (status, _) = app
        .post("/api/voice/start-interview", json!({ "studentId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn start_without_an_agent_is_unavailable() {
    let mut config = test_config(&[]);
    config.voice.assistant_id = None;
    let app = TestApp::with_config(config);

    let (status, _) = app
        .post("/api/voice/start-interview", json!({ "studentId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn start_requires_a_student_id() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/voice/start-interview", json!({ "studentId": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"], json!(["studentId"]));
}

#[tokio::test]
async fn webhook_rejects_missing_or_wrong_secret() {
    let app = TestApp::new();
    let body = report(json!(Uuid::new_v4()), "call-1", "Hello");

    let (status, _) = deliver(&app, body.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = deliver(&app, body, Some("guess")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_student_id_is_acknowledged_but_not_stored() {
    let app = TestApp::new();
    let mut body = report(json!(null), "call-2", "Hello");
    body["message"]["call"]["metadata"] = json!({});

    let (status, ack) = deliver(&app, body, Some(WEBHOOK_SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert!(ack.get("interviewId").is_none());
    assert_eq!(app.feedback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn end_of_call_report_is_scored_and_stored_once() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let body = report(json!(student), "call-3", "AI: Tell me about REST.\nUser: ...");

    let (status, ack) = deliver(&app, body.clone(), Some(WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ack["interviewId"].is_string());

    let (status, redelivered) = deliver(&app, body, Some(WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redelivered["interviewId"], ack["interviewId"]);
    // The transcript is scored once; redeliveries do not reach the model.
    assert_eq!(app.feedback.calls.load(Ordering::SeqCst), 1);

    let interviews = app.db.list_interviews(student).await.unwrap();
    assert_eq!(interviews.len(), 1);
    let interview = &interviews[0];
    assert_eq!(interview.status, InterviewStatus::Completed);
    assert_eq!(interview.score, Some(8));
    assert_eq!(interview.duration_seconds, 312);
    assert_eq!(interview.summary.as_deref(), Some("Discussed REST and SQL."));

    let (_, history) = app.get(&format!("/api/voice/history/{}", student)).await;
    assert_eq!(history[0]["callId"], "call-3");
    assert_eq!(history[0]["status"], "completed");
}

#[tokio::test]
async fn empty_transcript_is_stored_as_failed_without_feedback() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    deliver(&app, report(json!(student), "call-4", ""), Some(WEBHOOK_SECRET)).await;

    let interviews = app.db.list_interviews(student).await.unwrap();
    assert_eq!(interviews[0].status, InterviewStatus::Failed);
    assert_eq!(interviews[0].feedback, None);
    assert_eq!(app.feedback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn feedback_failure_still_stores_the_interview() {
    let app = TestApp::new();
    app.feedback.fail.store(true, Ordering::SeqCst);
    let student = Uuid::new_v4();

    let (status, _) = deliver(
        &app,
        report(json!(student), "call-5", "AI: Hi\nUser: Hello"),
        Some(WEBHOOK_SECRET),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let interviews = app.db.list_interviews(student).await.unwrap();
    assert_eq!(interviews[0].status, InterviewStatus::Completed);
    assert_eq!(interviews[0].score, None);
}

#[tokio::test]
async fn other_message_types_are_only_acknowledged() {
    let app = TestApp::new();
    let (status, ack) = deliver(
        &app,
        json!({ "message": { "type": "status-update", "status": "in-progress" } }),
        Some(WEBHOOK_SECRET),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
}
