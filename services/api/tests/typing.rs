mod common;

use academy_core::ports::DatabaseService;
use axum::http::StatusCode;
use common::TestApp;
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn submission_is_mirrored_into_legacy_progress() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    let (status, body) = app
        .post(
            "/api/typing/submit",
            json!({
                "studentId": student,
                "mode": "lesson",
                "lessonTitle": "Home row",
                "wpm": 55,
                "accuracy": 92,
                "durationSeconds": 60,
                "errors": { "j": 2 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["mode"], "lesson");

    let history = app.db.list_typing_history(student, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].wpm, 55.0);

    let progress = app
        .db
        .list_typing_progress(Some(&student.to_string()))
        .await
        .unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].wpm, 55.0);
    assert_eq!(progress[0].accuracy, 92.0);
    assert_eq!(progress[0].lesson.as_deref(), Some("Home row"));
    assert_eq!(progress[0].mode.as_deref(), Some("lesson"));
}

#[tokio::test]
async fn legacy_outage_does_not_fail_submission() {
    let app = TestApp::with_legacy_outage();
    let student = Uuid::new_v4();

    let (status, _) = app
        .post(
            "/api/typing/submit",
            json!({ "studentId": student, "wpm": 40, "accuracy": 88 }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.db.list_typing_history(student, 10).await.unwrap().len(), 1);
    assert!(app
        .db
        .list_typing_progress(Some(&student.to_string()))
        .await
        .unwrap()
        .is_empty());
}

#[rstest]
#[case(json!({ "wpm": 40, "accuracy": 90 }), "studentId")]
#[case(json!({ "studentId": "not-a-uuid", "wpm": 40, "accuracy": 90 }), "studentId")]
#[case(json!({ "studentId": Uuid::nil(), "wpm": -1, "accuracy": 90 }), "wpm")]
#[case(json!({ "studentId": Uuid::nil(), "wpm": 40, "accuracy": 101 }), "accuracy")]
#[case(json!({ "studentId": Uuid::nil(), "mode": "sprint", "wpm": 40, "accuracy": 90 }), "mode")]
#[tokio::test]
async fn invalid_submissions_name_the_field(
    #[case] body: serde_json::Value,
    #[case] field: &str,
) {
    let app = TestApp::new();
    let (status, response) = app.post("/api/typing/submit", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["fields"], json!([field]));
}

#[tokio::test]
async fn sessions_include_a_summary_of_the_page() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    for (wpm, accuracy) in [(40, 90), (55, 92), (61, 97)] {
        app.post(
            "/api/typing/submit",
            json!({ "studentId": student, "wpm": wpm, "accuracy": accuracy }),
        )
        .await;
    }

    let (status, body) = app
        .get(&format!("/api/typing/sessions/{}", student))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 3);
    assert_eq!(body["sessions"][0]["wpm"], 61.0);
    assert_eq!(body["summary"]["count"], 3);
    assert_eq!(body["summary"]["averageWpm"], 52.0);
    assert_eq!(body["summary"]["averageAccuracy"], 93.0);
    assert_eq!(body["summary"]["maxWpm"], 61.0);

    let (_, limited) = app
        .get(&format!("/api/typing/sessions/{}?limit=2", student))
        .await;
    assert_eq!(limited["summary"]["count"], 2);
}

#[rstest]
#[case("/api/typing/sessions/{}?limit=-1")]
#[case("/api/typing/sessions/{}?limit=many")]
#[case("/api/typing/sessions/not-a-uuid")]
#[tokio::test]
async fn bad_session_parameters_are_json_validation_errors(#[case] template: &str) {
    let app = TestApp::new();
    let uri = template.replace("{}", &Uuid::new_v4().to_string());

    let (status, body) = app.get(&uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation");
    assert_eq!(body["error"]["statusCode"], 400);
}

#[tokio::test]
async fn last_result_is_404_before_any_submission() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    let (status, _) = app.get(&format!("/api/typing/last/{}", student)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post(
        "/api/typing/submit",
        json!({ "studentId": student, "wpm": 33, "accuracy": 80 }),
    )
    .await;
    let (status, body) = app.get(&format!("/api/typing/last/{}", student)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wpm"], 33.0);
}

#[tokio::test]
async fn legacy_save_accepts_numeric_strings_and_feeds_analytics() {
    let app = TestApp::new();

    let (status, saved) = app
        .post(
            "/api/typing/save",
            json!({ "studentId": "legacy-7", "wpm": "48", "accuracy": "90.5" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["wpm"], 48.0);

    app.post(
        "/api/typing/save",
        json!({ "studentId": "legacy-7", "wpm": 52, "accuracy": 91.5 }),
    )
    .await;
    app.post(
        "/api/typing/save",
        json!({ "studentId": "legacy-8", "wpm": 70, "accuracy": 99 }),
    )
    .await;

    let (_, history) = app.get("/api/typing/history/legacy-7").await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[0]["wpm"], 52.0);

    let (_, one) = app.get("/api/typing/analytics?studentId=legacy-7").await;
    assert_eq!(one["count"], 2);
    assert_eq!(one["averageWpm"], 50.0);
    assert_eq!(one["averageAccuracy"], 91.0);
    assert_eq!(one["bestWpm"], 52.0);

    let (_, all) = app.get("/api/typing/analytics").await;
    assert_eq!(all["count"], 3);
    assert_eq!(all["bestWpm"], 70.0);
}

#[tokio::test]
async fn lessons_can_be_created_and_fetched() {
    let app = TestApp::new();

    let (status, created) = app
        .post(
            "/api/typing/lessons",
            json!({ "title": "Home row", "content": "asdf jkl;" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["difficulty"], "beginner");

    let (status, fetched) = app
        .get(&format!("/api/typing/lessons/{}", created["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["content"], "asdf jkl;");

    let (_, all) = app.get("/api/typing/lessons").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app
        .get(&format!("/api/typing/lessons/{}", Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
