//! Shared fixtures for the HTTP integration tests: an in-memory application with
//! recording fakes for the mail gateway, image store and feedback model.

#![allow(dead_code)]

use academy_core::domain::{
    BookingOutcome, DemoBooking, DemoSlot, Interview, InterviewFeedback, Job, JobChanges, Meeting,
    NewDemoBooking, NewDemoSlot, NewInterview, NewJob, NewMeeting, NewNotification, NewReview,
    NewStudent, NewTrainer, NewTypingHistory, NewTypingLesson, NewTypingProgress, Notification,
    Review, ReviewChanges, ReviewUpdate, StoredImage, Student, Trainer, TrainerStatus,
    TypingHistory, TypingLesson, TypingProgress,
};
use academy_core::ports::{
    DatabaseService, ImageStore, InterviewFeedbackService, MailService, PortError, PortResult,
};
use api_lib::{
    adapters::{InMemoryAttemptCounter, InMemoryDb},
    config::Config,
    web::{build_router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const ASSISTANT_ID: &str = "assistant-123";

//=========================================================================================
// Fakes
//=========================================================================================

pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Records every email and fails for the configured recipients. An optional delay
/// keeps sends in flight long enough to observe how many overlap.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    pub failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingMailer {
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn delay_sends(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }

    /// Body of the last email sent to `address`.
    pub fn html_to(&self, address: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == address)
            .map(|m| m.html.clone())
    }

    /// Highest number of sends observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailService for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> PortResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(to) {
            return Err(PortError::Unexpected(format!("mailbox {} unavailable", to)));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Hands out sequential image ids and records deletions.
#[derive(Default)]
pub struct FakeImageStore {
    next: AtomicUsize,
    pub fail_uploads: AtomicBool,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeImageStore {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn upload_image(
        &self,
        _file_name: &str,
        _content_type: Option<&str>,
        _data: Vec<u8>,
    ) -> PortResult<StoredImage> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("image store rejected the upload".into()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StoredImage {
            url: format!("https://images.test/img-{}.png", n),
            public_id: format!("img-{}", n),
        })
    }

    async fn delete_image(&self, public_id: &str) -> PortResult<()> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Scores every transcript 8/10, or fails when asked to.
#[derive(Default)]
pub struct FakeFeedback {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl InterviewFeedbackService for FakeFeedback {
    async fn evaluate_transcript(&self, _transcript: &str) -> PortResult<InterviewFeedback> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("model timed out".into()));
        }
        Ok(InterviewFeedback {
            feedback: "Clear answers with good structure.".into(),
            score: 8,
        })
    }
}

/// Delegates to an in-memory store but fails every write to the legacy progress
/// collection.
pub struct LegacyOutageDb {
    inner: Arc<InMemoryDb>,
}

#[async_trait]
impl DatabaseService for LegacyOutageDb {
    async fn create_trainer(&self, trainer: NewTrainer) -> PortResult<Trainer> {
        self.inner.create_trainer(trainer).await
    }

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> PortResult<Vec<Trainer>> {
        self.inner.list_trainers(status).await
    }

    async fn get_trainers_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Trainer>> {
        self.inner.get_trainers_by_ids(ids).await
    }

    async fn update_trainer_status(&self, id: Uuid, status: TrainerStatus) -> PortResult<Trainer> {
        self.inner.update_trainer_status(id, status).await
    }

    async fn create_student(&self, student: NewStudent) -> PortResult<Student> {
        self.inner.create_student(student).await
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        self.inner.list_students().await
    }

    async fn get_student(&self, id: Uuid) -> PortResult<Student> {
        self.inner.get_student(id).await
    }

    async fn create_meeting(&self, meeting: NewMeeting) -> PortResult<Meeting> {
        self.inner.create_meeting(meeting).await
    }

    async fn list_meetings(&self) -> PortResult<Vec<Meeting>> {
        self.inner.list_meetings().await
    }

    async fn get_meeting(&self, id: Uuid) -> PortResult<Meeting> {
        self.inner.get_meeting(id).await
    }

    async fn delete_meeting(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_meeting(id).await
    }

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        self.inner.create_notification(notification).await
    }

    async fn list_notifications(&self, trainer_id: Uuid) -> PortResult<Vec<Notification>> {
        self.inner.list_notifications(trainer_id).await
    }

    async fn mark_notification_read(&self, id: Uuid) -> PortResult<Notification> {
        self.inner.mark_notification_read(id).await
    }

    async fn create_review(&self, review: NewReview) -> PortResult<Review> {
        self.inner.create_review(review).await
    }

    async fn list_reviews(&self, approved_only: bool) -> PortResult<Vec<Review>> {
        self.inner.list_reviews(approved_only).await
    }

    async fn get_review(&self, id: Uuid) -> PortResult<Review> {
        self.inner.get_review(id).await
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> PortResult<ReviewUpdate> {
        self.inner.update_review(id, changes).await
    }

    async fn delete_review(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_review(id).await
    }

    async fn save_typing_history(&self, entry: NewTypingHistory) -> PortResult<TypingHistory> {
        self.inner.save_typing_history(entry).await
    }

    async fn list_typing_history(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<TypingHistory>> {
        self.inner.list_typing_history(student_id, limit).await
    }

    async fn save_typing_progress(&self, _entry: NewTypingProgress) -> PortResult<TypingProgress> {
        Err(PortError::Unexpected(
            "legacy progress collection is offline".to_string(),
        ))
    }

    async fn list_typing_progress(
        &self,
        student_id: Option<&str>,
    ) -> PortResult<Vec<TypingProgress>> {
        self.inner.list_typing_progress(student_id).await
    }

    async fn create_typing_lesson(&self, lesson: NewTypingLesson) -> PortResult<TypingLesson> {
        self.inner.create_typing_lesson(lesson).await
    }

    async fn list_typing_lessons(&self) -> PortResult<Vec<TypingLesson>> {
        self.inner.list_typing_lessons().await
    }

    async fn get_typing_lesson(&self, id: Uuid) -> PortResult<TypingLesson> {
        self.inner.get_typing_lesson(id).await
    }

    async fn create_demo_slot(&self, slot: NewDemoSlot) -> PortResult<DemoSlot> {
        self.inner.create_demo_slot(slot).await
    }

    async fn list_demo_slots(&self, available_only: bool) -> PortResult<Vec<DemoSlot>> {
        self.inner.list_demo_slots(available_only).await
    }

    async fn delete_demo_slot(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_demo_slot(id).await
    }

    async fn book_demo(&self, booking: NewDemoBooking) -> PortResult<BookingOutcome> {
        self.inner.book_demo(booking).await
    }

    async fn list_demo_bookings(&self) -> PortResult<Vec<DemoBooking>> {
        self.inner.list_demo_bookings().await
    }

    async fn save_interview(&self, interview: NewInterview) -> PortResult<Interview> {
        self.inner.save_interview(interview).await
    }

    async fn find_interview_by_call(&self, call_id: &str) -> PortResult<Option<Interview>> {
        self.inner.find_interview_by_call(call_id).await
    }

    async fn list_interviews(&self, student_id: Uuid) -> PortResult<Vec<Interview>> {
        self.inner.list_interviews(student_id).await
    }

    async fn create_job(&self, job: NewJob) -> PortResult<Job> {
        self.inner.create_job(job).await
    }

    async fn list_jobs(&self, student_only: Option<bool>) -> PortResult<Vec<Job>> {
        self.inner.list_jobs(student_only).await
    }

    async fn get_job(&self, id: Uuid) -> PortResult<Job> {
        self.inner.get_job(id).await
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> PortResult<Job> {
        self.inner.update_job(id, changes).await
    }

    async fn delete_job(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_job(id).await
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub mailer: Arc<RecordingMailer>,
    pub images: Arc<FakeImageStore>,
    pub feedback: Arc<FakeFeedback>,
}

pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = HashMap::from([
        ("VAPI_ASSISTANT_ID".to_string(), ASSISTANT_ID.to_string()),
        ("VAPI_WEBHOOK_SECRET".to_string(), WEBHOOK_SECRET.to_string()),
        ("API_BASE_URL".to_string(), "https://api.academy.test".to_string()),
    ]);
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let db = Arc::new(InMemoryDb::new());
        Self::assemble(config, db.clone(), db)
    }

    /// An application whose legacy progress writes fail. `db` still sees every other write.
    pub fn with_legacy_outage() -> Self {
        let db = Arc::new(InMemoryDb::new());
        let store = Arc::new(LegacyOutageDb { inner: db.clone() });
        Self::assemble(test_config(&[]), db, store)
    }

    fn assemble(config: Config, db: Arc<InMemoryDb>, store: Arc<dyn DatabaseService>) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let images = Arc::new(FakeImageStore::default());
        let feedback = Arc::new(FakeFeedback::default());

        let state = Arc::new(AppState {
            db: store,
            config: Arc::new(config),
            mailer: mailer.clone(),
            images: images.clone(),
            feedback: Some(feedback.clone() as Arc<dyn InterviewFeedbackService>),
            interview_attempts: Arc::new(InMemoryAttemptCounter::new()),
        });

        Self {
            router: build_router(state),
            db,
            mailer,
            images,
            feedback,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(method, uri, body)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, body).await
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

//=========================================================================================
// Multipart helper
//=========================================================================================

const BOUNDARY: &str = "academy-test-boundary";

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

pub fn multipart_request(method: Method, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.png\"\r\n\
                         Content-Type: image/png\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
