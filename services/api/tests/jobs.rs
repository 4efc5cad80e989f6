mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;
use rstest::rstest;
use serde_json::{json, Value};
use uuid::Uuid;

fn opening(title: &str, student_only: Value) -> Value {
    json!({
        "title": title,
        "company": "Acme Labs",
        "location": "Pune",
        "applyLink": "https://jobs.test/apply",
        "isStudentOnly": student_only
    })
}

#[rstest]
#[case(json!(true), true)]
#[case(json!("true"), true)]
#[case(json!("yes"), true)]
#[case(json!(1), true)]
#[case(json!("0"), false)]
#[case(json!(null), false)]
#[tokio::test]
async fn student_only_flag_accepts_loose_booleans(#[case] flag: Value, #[case] expected: bool) {
    let app = TestApp::new();
    let (status, job) = app.post("/api/admin/jobs", opening("Intern", flag)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(job["isStudentOnly"], expected);
}

#[tokio::test]
async fn unparseable_flag_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/admin/jobs", opening("Intern", json!("maybe")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation");
}

#[tokio::test]
async fn listing_can_be_filtered_to_student_only_openings() {
    let app = TestApp::new();
    app.post("/api/admin/jobs", opening("Open role", json!(false)))
        .await;
    app.post("/api/admin/jobs", opening("Campus role", json!(true)))
        .await;

    let (status, all) = app.get("/api/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["title"], "Campus role");

    let (_, students) = app.get("/api/jobs?studentOnly=true").await;
    assert_eq!(students.as_array().unwrap().len(), 1);
    assert_eq!(students[0]["title"], "Campus role");

    let (_, public) = app.get("/api/jobs?studentOnly=0").await;
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert_eq!(public[0]["title"], "Open role");
}

#[tokio::test]
async fn create_requires_title_and_company() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/admin/jobs", json!({ "title": " ", "location": "Pune" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["fields"], json!(["title", "company"]));
}

#[tokio::test]
async fn update_changes_only_the_given_fields() {
    let app = TestApp::new();
    let (_, job) = app
        .post("/api/admin/jobs", opening("Intern", json!(false)))
        .await;
    let id = job["id"].as_str().unwrap();

    let (status, updated) = app
        .json(
            Method::PUT,
            &format!("/api/admin/jobs/{}", id),
            json!({ "title": "Junior Developer", "isStudentOnly": "yes" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Junior Developer");
    assert_eq!(updated["company"], "Acme Labs");
    assert_eq!(updated["isStudentOnly"], true);

    let (_, fetched) = app.get(&format!("/api/jobs/{}", id)).await;
    assert_eq!(fetched["title"], "Junior Developer");
}

#[tokio::test]
async fn missing_jobs_are_404() {
    let app = TestApp::new();
    let missing = Uuid::new_v4();

    let (status, _) = app.get(&format!("/api/jobs/{}", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/api/admin/jobs/{}", missing),
            json!({ "title": "Ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_jobs_disappear() {
    let app = TestApp::new();
    let (_, job) = app
        .post("/api/admin/jobs", opening("Intern", json!(false)))
        .await;
    let id = job["id"].as_str().unwrap();

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/admin/jobs/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/jobs/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
