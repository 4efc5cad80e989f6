//! crates/academy_core/src/domain.rs
//!
//! Defines the pure, core data structures for the platform.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

//=========================================================================================
// People
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerStatus {
    Active,
    Inactive,
}

impl TrainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainerStatus::Active => "active",
            TrainerStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for TrainerStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TrainerStatus::Active),
            "inactive" => Ok(TrainerStatus::Inactive),
            other => Err(UnknownVariant::new("trainer status", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trainer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: TrainerStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTrainer {
    pub name: String,
    pub email: String,
    pub status: TrainerStatus,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
}

//=========================================================================================
// Meetings & Notifications
//=========================================================================================

/// Who a meeting is addressed to. Never empty: an absent list means everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attendees {
    /// Every trainer whose status is active at the time of the fan-out.
    All,
    Trainers(Vec<Uuid>),
}

impl Attendees {
    /// Sentinel used by clients to address every active trainer.
    pub const ALL_SENTINEL: &'static str = "ALL";

    /// Builds the attendee set from a list of trainer ids; an empty list means `All`.
    pub fn from_ids(ids: Vec<Uuid>) -> Self {
        if ids.is_empty() {
            Attendees::All
        } else {
            Attendees::Trainers(ids)
        }
    }

    pub fn includes(&self, trainer_id: Uuid) -> bool {
        match self {
            Attendees::All => true,
            Attendees::Trainers(ids) => ids.contains(&trainer_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub link: String,
    pub attendees: Attendees,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub link: String,
    pub attendees: Attendees,
}

/// An in-store message shown on the trainer dashboard.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub meeting_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub trainer_id: Uuid,
    pub meeting_id: Option<Uuid>,
    pub title: String,
    pub message: String,
}

//=========================================================================================
// Reviews
//=========================================================================================

/// Highest star rating a review may carry.
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone)]
pub struct Review {
    pub id: Uuid,
    pub student_name: String,
    pub role: String,
    pub review_text: String,
    pub rating: u8,
    pub student_image: String,
    pub image_public_id: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub student_name: String,
    pub role: String,
    pub review_text: String,
    pub rating: u8,
    pub student_image: String,
    pub image_public_id: String,
    pub is_approved: bool,
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub student_name: Option<String>,
    pub role: Option<String>,
    pub review_text: Option<String>,
    pub rating: Option<u8>,
    pub image: Option<StoredImage>,
    pub is_approved: Option<bool>,
}

impl Review {
    /// Applies the changes and returns the public id of the image they displaced, if any.
    pub fn apply(&mut self, changes: ReviewChanges, now: DateTime<Utc>) -> Option<String> {
        let mut replaced = None;
        if let Some(v) = changes.student_name {
            self.student_name = v;
        }
        if let Some(v) = changes.role {
            self.role = v;
        }
        if let Some(v) = changes.review_text {
            self.review_text = v;
        }
        if let Some(v) = changes.rating {
            self.rating = v;
        }
        if let Some(image) = changes.image {
            self.student_image = image.url;
            let previous = std::mem::replace(&mut self.image_public_id, image.public_id);
            if !previous.is_empty() && previous != self.image_public_id {
                replaced = Some(previous);
            }
        }
        if let Some(v) = changes.is_approved {
            self.is_approved = v;
        }
        self.updated_at = now;
        replaced
    }
}

/// A review after an update, with the image the update displaced.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub review: Review,
    pub replaced_image: Option<String>,
}

/// Handle of an image held by the remote image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

//=========================================================================================
// Typing practice
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingMode {
    Lesson,
    Practice,
    Test,
}

impl TypingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypingMode::Lesson => "lesson",
            TypingMode::Practice => "practice",
            TypingMode::Test => "test",
        }
    }
}

impl fmt::Display for TypingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypingMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lesson" => Ok(TypingMode::Lesson),
            "practice" => Ok(TypingMode::Practice),
            "test" => Ok(TypingMode::Test),
            other => Err(UnknownVariant::new("typing mode", other)),
        }
    }
}

/// One completed typing exercise.
#[derive(Debug, Clone)]
pub struct TypingHistory {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mode: TypingMode,
    pub lesson_title: Option<String>,
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_seconds: u32,
    pub correct_chars: u32,
    pub incorrect_chars: u32,
    /// Mistyped character -> number of times it was missed.
    pub errors: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTypingHistory {
    pub student_id: Uuid,
    pub mode: TypingMode,
    pub lesson_title: Option<String>,
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_seconds: u32,
    pub correct_chars: u32,
    pub incorrect_chars: u32,
    pub errors: BTreeMap<String, u32>,
}

/// Legacy progress row. Older clients still read and write this shape.
#[derive(Debug, Clone)]
pub struct TypingProgress {
    pub id: Uuid,
    pub student_id: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub lesson: Option<String>,
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTypingProgress {
    pub student_id: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub lesson: Option<String>,
    pub mode: Option<String>,
}

impl From<&TypingHistory> for NewTypingProgress {
    fn from(history: &TypingHistory) -> Self {
        Self {
            student_id: history.student_id.to_string(),
            wpm: history.wpm,
            accuracy: history.accuracy,
            lesson: history.lesson_title.clone(),
            mode: Some(history.mode.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypingLesson {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTypingLesson {
    pub title: String,
    pub content: String,
    pub difficulty: String,
}

/// Aggregates over a page of typing results.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TypingSummary {
    pub count: usize,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub max_wpm: f64,
}

impl TypingSummary {
    /// Summarises `(wpm, accuracy)` samples. Averages are rounded to two decimals.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut summary = TypingSummary::default();
        let (mut wpm_total, mut accuracy_total) = (0.0, 0.0);
        for (wpm, accuracy) in samples {
            summary.count += 1;
            wpm_total += wpm;
            accuracy_total += accuracy;
            if wpm > summary.max_wpm {
                summary.max_wpm = wpm;
            }
        }
        if summary.count > 0 {
            let n = summary.count as f64;
            summary.average_wpm = round2(wpm_total / n);
            summary.average_accuracy = round2(accuracy_total / n);
        }
        summary
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//=========================================================================================
// Demo bookings
//=========================================================================================

#[derive(Debug, Clone)]
pub struct DemoSlot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub is_booked: bool,
}

#[derive(Debug, Clone)]
pub struct NewDemoSlot {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone)]
pub struct DemoBooking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course: Option<String>,
    pub education: Option<String>,
    pub date: NaiveDate,
    pub time_slot: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDemoBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course: Option<String>,
    pub education: Option<String>,
    pub date: NaiveDate,
    pub time_slot: String,
}

/// Result of recording a booking together with its slot reservation.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: DemoBooking,
    /// The slot flipped to booked, if one matched the requested day and time.
    pub reserved_slot: Option<Uuid>,
}

//=========================================================================================
// Mock interviews
//=========================================================================================

/// Maximum number of interview sessions a student may start per calendar day.
pub const DAILY_INTERVIEW_LIMIT: u32 = 3;

/// Highest score the feedback model may award.
pub const MAX_INTERVIEW_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewStatus {
    Completed,
    Failed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Completed => "completed",
            InterviewStatus::Failed => "failed",
        }
    }
}

impl FromStr for InterviewStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(InterviewStatus::Completed),
            "failed" => Ok(InterviewStatus::Failed),
            other => Err(UnknownVariant::new("interview status", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Interview {
    pub id: Uuid,
    pub student_id: Uuid,
    pub call_id: String,
    pub transcript: String,
    pub summary: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    pub duration_seconds: u32,
    pub recording_url: Option<String>,
    pub status: InterviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInterview {
    pub student_id: Uuid,
    pub call_id: String,
    pub transcript: String,
    pub summary: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    pub duration_seconds: u32,
    pub recording_url: Option<String>,
    pub status: InterviewStatus,
}

/// Structured evaluation produced from an interview transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewFeedback {
    pub feedback: String,
    pub score: u8,
}

/// Whether an attempt fits under a daily cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    Allowed { used: u32 },
    Rejected { used: u32 },
}

//=========================================================================================
// Jobs
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub apply_link: Option<String>,
    pub is_student_only: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub apply_link: Option<String>,
    pub is_student_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub apply_link: Option<String>,
    pub is_student_only: Option<bool>,
}

impl Job {
    pub fn apply(&mut self, changes: JobChanges) {
        if let Some(v) = changes.title {
            self.title = v;
        }
        if let Some(v) = changes.company {
            self.company = v;
        }
        if let Some(v) = changes.location {
            self.location = Some(v);
        }
        if let Some(v) = changes.description {
            self.description = Some(v);
        }
        if let Some(v) = changes.apply_link {
            self.apply_link = Some(v);
        }
        if let Some(v) = changes.is_student_only {
            self.is_student_only = v;
        }
    }
}
