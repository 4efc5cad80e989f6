//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use academy_core::domain::{
    Attendees, BookingOutcome, DemoBooking, DemoSlot, Interview, InterviewStatus, Job,
    JobChanges, Meeting, NewDemoBooking, NewDemoSlot, NewInterview, NewJob, NewMeeting,
    NewNotification, NewReview, NewStudent, NewTrainer, NewTypingHistory, NewTypingLesson,
    NewTypingProgress, Notification, Review, ReviewChanges, ReviewUpdate, Student, Trainer,
    TrainerStatus, TypingHistory, TypingLesson, TypingMode, TypingProgress,
};
use academy_core::ports::{DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a single-row lookup failure, turning `RowNotFound` into `NotFound`.
fn lookup_error(kind: &'static str, id: Uuid) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", kind, id)),
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Maps an insert failure, turning a unique-key violation into `Conflict`.
fn insert_error(conflict: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => PortError::Conflict(conflict),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn ensure_deleted(kind: &str, id: Uuid, rows: u64) -> PortResult<()> {
    if rows == 0 {
        return Err(PortError::NotFound(format!("{} {} not found", kind, id)));
    }
    Ok(())
}

fn corrupt(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Stored value could not be read: {}", e))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const TRAINER_COLUMNS: &str = "id, name, email, status, created_at";

#[derive(FromRow)]
struct TrainerRecord {
    id: Uuid,
    name: String,
    email: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl TrainerRecord {
    fn to_domain(self) -> PortResult<Trainer> {
        Ok(Trainer {
            id: self.id,
            name: self.name,
            email: self.email,
            status: self.status.parse().map_err(corrupt)?,
            created_at: self.created_at,
        })
    }
}

const STUDENT_COLUMNS: &str = "id, name, email, phone, course, created_at";

#[derive(FromRow)]
struct StudentRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    course: Option<String>,
    created_at: DateTime<Utc>,
}
impl StudentRecord {
    fn to_domain(self) -> Student {
        Student {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            course: self.course,
            created_at: self.created_at,
        }
    }
}

const MEETING_COLUMNS: &str =
    "id, title, description, date, time, link, attendees_all, attendee_ids, created_at";

#[derive(FromRow)]
struct MeetingRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    date: NaiveDate,
    time: String,
    link: String,
    attendees_all: bool,
    attendee_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}
impl MeetingRecord {
    fn to_domain(self) -> Meeting {
        let attendees = if self.attendees_all {
            Attendees::All
        } else {
            Attendees::from_ids(self.attendee_ids)
        };
        Meeting {
            id: self.id,
            title: self.title,
            description: self.description,
            date: self.date,
            time: self.time,
            link: self.link,
            attendees,
            created_at: self.created_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, trainer_id, meeting_id, title, message, is_read, created_at";

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    trainer_id: Uuid,
    meeting_id: Option<Uuid>,
    title: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            trainer_id: self.trainer_id,
            meeting_id: self.meeting_id,
            title: self.title,
            message: self.message,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

const REVIEW_COLUMNS: &str = "id, student_name, role, review_text, rating, student_image, \
                              image_public_id, is_approved, created_at, updated_at";

#[derive(FromRow)]
struct ReviewRecord {
    id: Uuid,
    student_name: String,
    role: String,
    review_text: String,
    rating: i16,
    student_image: String,
    image_public_id: String,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ReviewRecord {
    fn to_domain(self) -> Review {
        Review {
            id: self.id,
            student_name: self.student_name,
            role: self.role,
            review_text: self.review_text,
            rating: self.rating.clamp(0, 5) as u8,
            student_image: self.student_image,
            image_public_id: self.image_public_id,
            is_approved: self.is_approved,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const TYPING_HISTORY_COLUMNS: &str = "id, student_id, mode, lesson_title, wpm, accuracy, \
                                      duration_seconds, correct_chars, incorrect_chars, errors, created_at";

#[derive(FromRow)]
struct TypingHistoryRecord {
    id: Uuid,
    student_id: Uuid,
    mode: String,
    lesson_title: Option<String>,
    wpm: f64,
    accuracy: f64,
    duration_seconds: i32,
    correct_chars: i32,
    incorrect_chars: i32,
    errors: Json<BTreeMap<String, u32>>,
    created_at: DateTime<Utc>,
}
impl TypingHistoryRecord {
    fn to_domain(self) -> PortResult<TypingHistory> {
        Ok(TypingHistory {
            id: self.id,
            student_id: self.student_id,
            mode: self.mode.parse::<TypingMode>().map_err(corrupt)?,
            lesson_title: self.lesson_title,
            wpm: self.wpm,
            accuracy: self.accuracy,
            duration_seconds: self.duration_seconds.max(0) as u32,
            correct_chars: self.correct_chars.max(0) as u32,
            incorrect_chars: self.incorrect_chars.max(0) as u32,
            errors: self.errors.0,
            created_at: self.created_at,
        })
    }
}

const TYPING_PROGRESS_COLUMNS: &str = "id, student_id, wpm, accuracy, lesson, mode, created_at";

#[derive(FromRow)]
struct TypingProgressRecord {
    id: Uuid,
    student_id: String,
    wpm: f64,
    accuracy: f64,
    lesson: Option<String>,
    mode: Option<String>,
    created_at: DateTime<Utc>,
}
impl TypingProgressRecord {
    fn to_domain(self) -> TypingProgress {
        TypingProgress {
            id: self.id,
            student_id: self.student_id,
            wpm: self.wpm,
            accuracy: self.accuracy,
            lesson: self.lesson,
            mode: self.mode,
            created_at: self.created_at,
        }
    }
}

const LESSON_COLUMNS: &str = "id, title, content, difficulty, created_at";

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    title: String,
    content: String,
    difficulty: String,
    created_at: DateTime<Utc>,
}
impl LessonRecord {
    fn to_domain(self) -> TypingLesson {
        TypingLesson {
            id: self.id,
            title: self.title,
            content: self.content,
            difficulty: self.difficulty,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DemoSlotRecord {
    id: Uuid,
    date: NaiveDate,
    time: String,
    is_booked: bool,
}
impl DemoSlotRecord {
    fn to_domain(self) -> DemoSlot {
        DemoSlot {
            id: self.id,
            date: self.date,
            time: self.time,
            is_booked: self.is_booked,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, name, email, phone, course, education, date, time_slot, created_at";

#[derive(FromRow)]
struct DemoBookingRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    course: Option<String>,
    education: Option<String>,
    date: NaiveDate,
    time_slot: String,
    created_at: DateTime<Utc>,
}
impl DemoBookingRecord {
    fn to_domain(self) -> DemoBooking {
        DemoBooking {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            course: self.course,
            education: self.education,
            date: self.date,
            time_slot: self.time_slot,
            created_at: self.created_at,
        }
    }
}

const INTERVIEW_COLUMNS: &str = "id, student_id, call_id, transcript, summary, feedback, score, \
                                 duration_seconds, recording_url, status, created_at";

#[derive(FromRow)]
struct InterviewRecord {
    id: Uuid,
    student_id: Uuid,
    call_id: String,
    transcript: String,
    summary: Option<String>,
    feedback: Option<String>,
    score: Option<i16>,
    duration_seconds: i32,
    recording_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}
impl InterviewRecord {
    fn to_domain(self) -> PortResult<Interview> {
        Ok(Interview {
            id: self.id,
            student_id: self.student_id,
            call_id: self.call_id,
            transcript: self.transcript,
            summary: self.summary,
            feedback: self.feedback,
            score: self.score.map(|s| s.clamp(0, 10) as u8),
            duration_seconds: self.duration_seconds.max(0) as u32,
            recording_url: self.recording_url,
            status: self.status.parse::<InterviewStatus>().map_err(corrupt)?,
            created_at: self.created_at,
        })
    }
}

const JOB_COLUMNS: &str =
    "id, title, company, location, description, apply_link, is_student_only, created_at";

#[derive(FromRow)]
struct JobRecord {
    id: Uuid,
    title: String,
    company: String,
    location: Option<String>,
    description: Option<String>,
    apply_link: Option<String>,
    is_student_only: bool,
    created_at: DateTime<Utc>,
}
impl JobRecord {
    fn to_domain(self) -> Job {
        Job {
            id: self.id,
            title: self.title,
            company: self.company,
            location: self.location,
            description: self.description,
            apply_link: self.apply_link,
            is_student_only: self.is_student_only,
            created_at: self.created_at,
        }
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Trainers & Students ---
    async fn create_trainer(&self, trainer: NewTrainer) -> PortResult<Trainer> {
        let record = sqlx::query_as::<_, TrainerRecord>(&format!(
            "INSERT INTO trainers (id, name, email, status) VALUES ($1, $2, $3, $4) RETURNING {}",
            TRAINER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(trainer.name)
        .bind(&trainer.email)
        .bind(trainer.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error(format!("Trainer {} already exists", trainer.email)))?;
        record.to_domain()
    }

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> PortResult<Vec<Trainer>> {
        let records = sqlx::query_as::<_, TrainerRecord>(&format!(
            "SELECT {} FROM trainers WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY name ASC",
            TRAINER_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_trainers_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Trainer>> {
        let records = sqlx::query_as::<_, TrainerRecord>(&format!(
            "SELECT {} FROM trainers WHERE id = ANY($1)",
            TRAINER_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_trainer_status(&self, id: Uuid, status: TrainerStatus) -> PortResult<Trainer> {
        let record = sqlx::query_as::<_, TrainerRecord>(&format!(
            "UPDATE trainers SET status = $1 WHERE id = $2 RETURNING {}",
            TRAINER_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Trainer", id))?;
        record.to_domain()
    }

    async fn create_student(&self, student: NewStudent) -> PortResult<Student> {
        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            "INSERT INTO students (id, name, email, phone, course) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(student.name)
        .bind(&student.email)
        .bind(student.phone)
        .bind(student.course)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error(format!("Student {} already exists", student.email)))?;
        Ok(record.to_domain())
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        let records = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {} FROM students ORDER BY created_at DESC",
            STUDENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_student(&self, id: Uuid) -> PortResult<Student> {
        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Student", id))?;
        Ok(record.to_domain())
    }

    // --- Meetings & Notifications ---
    async fn create_meeting(&self, meeting: NewMeeting) -> PortResult<Meeting> {
        let (attendees_all, attendee_ids) = match meeting.attendees {
            Attendees::All => (true, Vec::new()),
            Attendees::Trainers(ids) => (false, ids),
        };
        let record = sqlx::query_as::<_, MeetingRecord>(&format!(
            "INSERT INTO meetings (id, title, description, date, time, link, attendees_all, attendee_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            MEETING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(meeting.title)
        .bind(meeting.description)
        .bind(meeting.date)
        .bind(meeting.time)
        .bind(meeting.link)
        .bind(attendees_all)
        .bind(attendee_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_meetings(&self) -> PortResult<Vec<Meeting>> {
        let records = sqlx::query_as::<_, MeetingRecord>(&format!(
            "SELECT {} FROM meetings ORDER BY date DESC, time DESC",
            MEETING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_meeting(&self, id: Uuid) -> PortResult<Meeting> {
        let record = sqlx::query_as::<_, MeetingRecord>(&format!(
            "SELECT {} FROM meetings WHERE id = $1",
            MEETING_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Meeting", id))?;
        Ok(record.to_domain())
    }

    async fn delete_meeting(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted("Meeting", id, result.rows_affected())
    }

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "INSERT INTO notifications (id, trainer_id, meeting_id, title, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(notification.trainer_id)
        .bind(notification.meeting_id)
        .bind(notification.title)
        .bind(notification.message)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_notifications(&self, trainer_id: Uuid) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {} FROM notifications WHERE trainer_id = $1 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_notification_read(&self, id: Uuid) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Notification", id))?;
        Ok(record.to_domain())
    }

    // --- Reviews ---
    async fn create_review(&self, review: NewReview) -> PortResult<Review> {
        let record = sqlx::query_as::<_, ReviewRecord>(&format!(
            "INSERT INTO reviews (id, student_name, role, review_text, rating, student_image, image_public_id, is_approved) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(review.student_name)
        .bind(review.role)
        .bind(review.review_text)
        .bind(i16::from(review.rating))
        .bind(review.student_image)
        .bind(review.image_public_id)
        .bind(review.is_approved)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_reviews(&self, approved_only: bool) -> PortResult<Vec<Review>> {
        let records = sqlx::query_as::<_, ReviewRecord>(&format!(
            "SELECT {} FROM reviews WHERE (NOT $1 OR is_approved) ORDER BY created_at DESC",
            REVIEW_COLUMNS
        ))
        .bind(approved_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_review(&self, id: Uuid) -> PortResult<Review> {
        let record = sqlx::query_as::<_, ReviewRecord>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Review", id))?;
        Ok(record.to_domain())
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> PortResult<ReviewUpdate> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut review = sqlx::query_as::<_, ReviewRecord>(&format!(
            "SELECT {} FROM reviews WHERE id = $1 FOR UPDATE",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(lookup_error("Review", id))?
        .to_domain();

        let replaced_image = review.apply(changes, Utc::now());

        let record = sqlx::query_as::<_, ReviewRecord>(&format!(
            "UPDATE reviews SET student_name = $1, role = $2, review_text = $3, rating = $4, \
             student_image = $5, image_public_id = $6, is_approved = $7, updated_at = $8 \
             WHERE id = $9 RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(review.student_name)
        .bind(review.role)
        .bind(review.review_text)
        .bind(i16::from(review.rating))
        .bind(review.student_image)
        .bind(review.image_public_id)
        .bind(review.is_approved)
        .bind(review.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(ReviewUpdate {
            review: record.to_domain(),
            replaced_image,
        })
    }

    async fn delete_review(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted("Review", id, result.rows_affected())
    }

    // --- Typing Practice ---
    async fn save_typing_history(&self, entry: NewTypingHistory) -> PortResult<TypingHistory> {
        let record = sqlx::query_as::<_, TypingHistoryRecord>(&format!(
            "INSERT INTO typing_history (id, student_id, mode, lesson_title, wpm, accuracy, \
             duration_seconds, correct_chars, incorrect_chars, errors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            TYPING_HISTORY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(entry.student_id)
        .bind(entry.mode.as_str())
        .bind(entry.lesson_title)
        .bind(entry.wpm)
        .bind(entry.accuracy)
        .bind(to_i32(entry.duration_seconds))
        .bind(to_i32(entry.correct_chars))
        .bind(to_i32(entry.incorrect_chars))
        .bind(Json(entry.errors))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_typing_history(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<TypingHistory>> {
        let records = sqlx::query_as::<_, TypingHistoryRecord>(&format!(
            "SELECT {} FROM typing_history WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2",
            TYPING_HISTORY_COLUMNS
        ))
        .bind(student_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn save_typing_progress(&self, entry: NewTypingProgress) -> PortResult<TypingProgress> {
        let record = sqlx::query_as::<_, TypingProgressRecord>(&format!(
            "INSERT INTO typing_progress (id, student_id, wpm, accuracy, lesson, mode) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TYPING_PROGRESS_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(entry.student_id)
        .bind(entry.wpm)
        .bind(entry.accuracy)
        .bind(entry.lesson)
        .bind(entry.mode)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_typing_progress(
        &self,
        student_id: Option<&str>,
    ) -> PortResult<Vec<TypingProgress>> {
        let records = sqlx::query_as::<_, TypingProgressRecord>(&format!(
            "SELECT {} FROM typing_progress WHERE ($1::TEXT IS NULL OR student_id = $1) \
             ORDER BY created_at DESC",
            TYPING_PROGRESS_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_typing_lesson(&self, lesson: NewTypingLesson) -> PortResult<TypingLesson> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "INSERT INTO typing_lessons (id, title, content, difficulty) VALUES ($1, $2, $3, $4) RETURNING {}",
            LESSON_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(lesson.title)
        .bind(lesson.content)
        .bind(lesson.difficulty)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_typing_lessons(&self) -> PortResult<Vec<TypingLesson>> {
        let records = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {} FROM typing_lessons ORDER BY created_at ASC",
            LESSON_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_typing_lesson(&self, id: Uuid) -> PortResult<TypingLesson> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {} FROM typing_lessons WHERE id = $1",
            LESSON_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Lesson", id))?;
        Ok(record.to_domain())
    }

    // --- Demo Slots & Bookings ---
    async fn create_demo_slot(&self, slot: NewDemoSlot) -> PortResult<DemoSlot> {
        let conflict = format!("A slot already exists for {} at {}", slot.date, slot.time);
        let record = sqlx::query_as::<_, DemoSlotRecord>(
            "INSERT INTO demo_slots (id, date, time) VALUES ($1, $2, $3) \
             RETURNING id, date, time, is_booked",
        )
        .bind(Uuid::new_v4())
        .bind(slot.date)
        .bind(slot.time)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error(conflict))?;
        Ok(record.to_domain())
    }

    async fn list_demo_slots(&self, available_only: bool) -> PortResult<Vec<DemoSlot>> {
        let records = sqlx::query_as::<_, DemoSlotRecord>(
            "SELECT id, date, time, is_booked FROM demo_slots \
             WHERE (NOT $1 OR NOT is_booked) ORDER BY date ASC, time ASC",
        )
        .bind(available_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_demo_slot(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM demo_slots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted("Slot", id, result.rows_affected())
    }

    async fn book_demo(&self, booking: NewDemoBooking) -> PortResult<BookingOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The row lock serialises concurrent bookings of the same slot.
        let slot: Option<(Uuid, bool)> = sqlx::query_as(
            "SELECT id, is_booked FROM demo_slots WHERE date = $1 AND time = $2 FOR UPDATE",
        )
        .bind(booking.date)
        .bind(&booking.time_slot)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let reserved_slot = match slot {
            Some((_, true)) => {
                return Err(PortError::Conflict(format!(
                    "The {} slot on {} is already booked",
                    booking.time_slot, booking.date
                )));
            }
            Some((slot_id, false)) => {
                sqlx::query("UPDATE demo_slots SET is_booked = TRUE WHERE id = $1 AND NOT is_booked")
                    .bind(slot_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
                Some(slot_id)
            }
            None => None,
        };

        let record = sqlx::query_as::<_, DemoBookingRecord>(&format!(
            "INSERT INTO demo_bookings (id, name, email, phone, course, education, date, time_slot) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(booking.name)
        .bind(booking.email)
        .bind(booking.phone)
        .bind(booking.course)
        .bind(booking.education)
        .bind(booking.date)
        .bind(booking.time_slot)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(BookingOutcome {
            booking: record.to_domain(),
            reserved_slot,
        })
    }

    async fn list_demo_bookings(&self) -> PortResult<Vec<DemoBooking>> {
        let records = sqlx::query_as::<_, DemoBookingRecord>(&format!(
            "SELECT {} FROM demo_bookings ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Interviews ---
    async fn save_interview(&self, interview: NewInterview) -> PortResult<Interview> {
        let conflict = format!("Interview for call {} already recorded", interview.call_id);
        let record = sqlx::query_as::<_, InterviewRecord>(&format!(
            "INSERT INTO interviews (id, student_id, call_id, transcript, summary, feedback, score, \
             duration_seconds, recording_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            INTERVIEW_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(interview.student_id)
        .bind(interview.call_id)
        .bind(interview.transcript)
        .bind(interview.summary)
        .bind(interview.feedback)
        .bind(interview.score.map(i16::from))
        .bind(to_i32(interview.duration_seconds))
        .bind(interview.recording_url)
        .bind(interview.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error(conflict))?;
        record.to_domain()
    }

    async fn find_interview_by_call(&self, call_id: &str) -> PortResult<Option<Interview>> {
        let record = sqlx::query_as::<_, InterviewRecord>(&format!(
            "SELECT {} FROM interviews WHERE call_id = $1",
            INTERVIEW_COLUMNS
        ))
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn list_interviews(&self, student_id: Uuid) -> PortResult<Vec<Interview>> {
        let records = sqlx::query_as::<_, InterviewRecord>(&format!(
            "SELECT {} FROM interviews WHERE student_id = $1 ORDER BY created_at DESC",
            INTERVIEW_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    // --- Jobs ---
    async fn create_job(&self, job: NewJob) -> PortResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>(&format!(
            "INSERT INTO jobs (id, title, company, location, description, apply_link, is_student_only) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(job.title)
        .bind(job.company)
        .bind(job.location)
        .bind(job.description)
        .bind(job.apply_link)
        .bind(job.is_student_only)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_jobs(&self, student_only: Option<bool>) -> PortResult<Vec<Job>> {
        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE ($1::BOOLEAN IS NULL OR is_student_only = $1) \
             ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(student_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_job(&self, id: Uuid) -> PortResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(lookup_error("Job", id))?;
        Ok(record.to_domain())
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> PortResult<Job> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut job = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE id = $1 FOR UPDATE",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(lookup_error("Job", id))?
        .to_domain();

        job.apply(changes);

        let record = sqlx::query_as::<_, JobRecord>(&format!(
            "UPDATE jobs SET title = $1, company = $2, location = $3, description = $4, \
             apply_link = $5, is_student_only = $6 WHERE id = $7 RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(job.title)
        .bind(job.company)
        .bind(job.location)
        .bind(job.description)
        .bind(job.apply_link)
        .bind(job.is_student_only)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_job(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_deleted("Job", id, result.rows_affected())
    }
}
