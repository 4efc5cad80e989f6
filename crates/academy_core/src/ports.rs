//! crates/academy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the platform's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    AttemptDecision, BookingOutcome, DemoBooking, DemoSlot, Interview, InterviewFeedback, Job,
    JobChanges, Meeting, NewDemoBooking, NewDemoSlot, NewInterview, NewJob, NewMeeting,
    NewNotification, NewReview, NewStudent, NewTrainer, NewTypingHistory, NewTypingLesson,
    NewTypingProgress, Notification, Review, ReviewChanges, ReviewUpdate, StoredImage, Student,
    Trainer, TrainerStatus, TypingHistory, TypingLesson, TypingProgress,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Trainers & Students ---
    async fn create_trainer(&self, trainer: NewTrainer) -> PortResult<Trainer>;

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> PortResult<Vec<Trainer>>;

    async fn get_trainers_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Trainer>>;

    async fn update_trainer_status(&self, id: Uuid, status: TrainerStatus) -> PortResult<Trainer>;

    async fn create_student(&self, student: NewStudent) -> PortResult<Student>;

    async fn list_students(&self) -> PortResult<Vec<Student>>;

    async fn get_student(&self, id: Uuid) -> PortResult<Student>;

    // --- Meetings & Notifications ---
    async fn create_meeting(&self, meeting: NewMeeting) -> PortResult<Meeting>;

    /// Lists meetings, latest date first.
    async fn list_meetings(&self) -> PortResult<Vec<Meeting>>;

    async fn get_meeting(&self, id: Uuid) -> PortResult<Meeting>;

    async fn delete_meeting(&self, id: Uuid) -> PortResult<()>;

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification>;

    /// Lists a trainer's notifications, newest first.
    async fn list_notifications(&self, trainer_id: Uuid) -> PortResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: Uuid) -> PortResult<Notification>;

    // --- Reviews ---
    async fn create_review(&self, review: NewReview) -> PortResult<Review>;

    async fn list_reviews(&self, approved_only: bool) -> PortResult<Vec<Review>>;

    async fn get_review(&self, id: Uuid) -> PortResult<Review>;

    /// Applies the changes under the store's lock and reports the image they displaced.
    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> PortResult<ReviewUpdate>;

    async fn delete_review(&self, id: Uuid) -> PortResult<()>;

    // --- Typing Practice ---
    async fn save_typing_history(&self, entry: NewTypingHistory) -> PortResult<TypingHistory>;

    /// Lists a student's typing results, newest first, at most `limit` rows.
    async fn list_typing_history(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<TypingHistory>>;

    async fn save_typing_progress(&self, entry: NewTypingProgress) -> PortResult<TypingProgress>;

    /// Lists legacy progress rows, newest first. `None` lists every student.
    async fn list_typing_progress(&self, student_id: Option<&str>)
        -> PortResult<Vec<TypingProgress>>;

    async fn create_typing_lesson(&self, lesson: NewTypingLesson) -> PortResult<TypingLesson>;

    async fn list_typing_lessons(&self) -> PortResult<Vec<TypingLesson>>;

    async fn get_typing_lesson(&self, id: Uuid) -> PortResult<TypingLesson>;

    // --- Demo Slots & Bookings ---
    /// Fails with `Conflict` if a slot for the same date and time already exists.
    async fn create_demo_slot(&self, slot: NewDemoSlot) -> PortResult<DemoSlot>;

    async fn list_demo_slots(&self, available_only: bool) -> PortResult<Vec<DemoSlot>>;

    async fn delete_demo_slot(&self, id: Uuid) -> PortResult<()>;

    /// Records a booking and reserves the matching slot as one atomic step.
    ///
    /// Fails with `Conflict` (and records nothing) if the matching slot is already booked.
    /// A booking with no matching slot is still recorded.
    async fn book_demo(&self, booking: NewDemoBooking) -> PortResult<BookingOutcome>;

    async fn list_demo_bookings(&self) -> PortResult<Vec<DemoBooking>>;

    // --- Interviews ---
    /// Fails with `Conflict` if an interview with the same call id exists.
    async fn save_interview(&self, interview: NewInterview) -> PortResult<Interview>;

    async fn find_interview_by_call(&self, call_id: &str) -> PortResult<Option<Interview>>;

    async fn list_interviews(&self, student_id: Uuid) -> PortResult<Vec<Interview>>;

    // --- Jobs ---
    async fn create_job(&self, job: NewJob) -> PortResult<Job>;

    async fn list_jobs(&self, student_only: Option<bool>) -> PortResult<Vec<Job>>;

    async fn get_job(&self, id: Uuid) -> PortResult<Job>;

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> PortResult<Job>;

    async fn delete_job(&self, id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Sends a single HTML email.
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads an image and returns its public URL and remote handle.
    async fn upload_image(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> PortResult<StoredImage>;

    /// Removes a previously uploaded image.
    async fn delete_image(&self, public_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait InterviewFeedbackService: Send + Sync {
    /// Evaluates an interview transcript into written feedback and a score.
    async fn evaluate_transcript(&self, transcript: &str) -> PortResult<InterviewFeedback>;
}

#[async_trait]
pub trait AttemptCounter: Send + Sync {
    /// Counts one attempt for `subject` on `day` if fewer than `limit` were already made.
    /// Rejected attempts are not counted.
    async fn try_record(&self, subject: &str, day: NaiveDate, limit: u32)
        -> PortResult<AttemptDecision>;
}
