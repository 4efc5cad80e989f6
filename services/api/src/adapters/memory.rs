//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used when no
//! `DATABASE_URL` is configured and by the test suite.
//!
//! All collections live behind a single async mutex, so every port call is atomic
//! with respect to every other one.

use academy_core::domain::{
    BookingOutcome, DemoBooking, DemoSlot, Interview, Job, JobChanges, Meeting,
    NewDemoBooking, NewDemoSlot, NewInterview, NewJob, NewMeeting, NewNotification, NewReview,
    NewStudent, NewTrainer, NewTypingHistory, NewTypingLesson, NewTypingProgress, Notification,
    Review, ReviewChanges, ReviewUpdate, Student, Trainer, TrainerStatus, TypingHistory,
    TypingLesson, TypingProgress,
};
use academy_core::ports::{DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    trainers: Vec<Trainer>,
    students: Vec<Student>,
    meetings: Vec<Meeting>,
    notifications: Vec<Notification>,
    reviews: Vec<Review>,
    typing_history: Vec<TypingHistory>,
    typing_progress: Vec<TypingProgress>,
    typing_lessons: Vec<TypingLesson>,
    demo_slots: Vec<DemoSlot>,
    demo_bookings: Vec<DemoBooking>,
    interviews: Vec<Interview>,
    jobs: Vec<Job>,
}

/// A `DatabaseService` that keeps every record in memory.
#[derive(Default)]
pub struct InMemoryDb {
    data: Mutex<Collections>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored demo bookings.
    pub async fn booking_count(&self) -> usize {
        self.data.lock().await.demo_bookings.len()
    }
}

fn not_found(kind: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", kind, id))
}

/// Removes the element with the given id, or reports it missing.
fn remove_by<T>(items: &mut Vec<T>, kind: &str, id: Uuid, key: impl Fn(&T) -> Uuid) -> PortResult<()> {
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        return Err(not_found(kind, id));
    }
    Ok(())
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    // --- Trainers & Students ---
    async fn create_trainer(&self, trainer: NewTrainer) -> PortResult<Trainer> {
        let mut data = self.data.lock().await;
        if data.trainers.iter().any(|t| t.email == trainer.email) {
            return Err(PortError::Conflict(format!("Trainer {} already exists", trainer.email)));
        }
        let record = Trainer {
            id: Uuid::new_v4(),
            name: trainer.name,
            email: trainer.email,
            status: trainer.status,
            created_at: Utc::now(),
        };
        data.trainers.push(record.clone());
        Ok(record)
    }

    async fn list_trainers(&self, status: Option<TrainerStatus>) -> PortResult<Vec<Trainer>> {
        let data = self.data.lock().await;
        let mut trainers: Vec<Trainer> = data
            .trainers
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        trainers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(trainers)
    }

    async fn get_trainers_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Trainer>> {
        let data = self.data.lock().await;
        Ok(data
            .trainers
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn update_trainer_status(&self, id: Uuid, status: TrainerStatus) -> PortResult<Trainer> {
        let mut data = self.data.lock().await;
        let trainer = data
            .trainers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Trainer", id))?;
        trainer.status = status;
        Ok(trainer.clone())
    }

    async fn create_student(&self, student: NewStudent) -> PortResult<Student> {
        let mut data = self.data.lock().await;
        if data.students.iter().any(|s| s.email == student.email) {
            return Err(PortError::Conflict(format!("Student {} already exists", student.email)));
        }
        let record = Student {
            id: Uuid::new_v4(),
            name: student.name,
            email: student.email,
            phone: student.phone,
            course: student.course,
            created_at: Utc::now(),
        };
        data.students.push(record.clone());
        Ok(record)
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        let mut students = self.data.lock().await.students.clone();
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(students)
    }

    async fn get_student(&self, id: Uuid) -> PortResult<Student> {
        let data = self.data.lock().await;
        data.students
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("Student", id))
    }

    // --- Meetings & Notifications ---
    async fn create_meeting(&self, meeting: NewMeeting) -> PortResult<Meeting> {
        let record = Meeting {
            id: Uuid::new_v4(),
            title: meeting.title,
            description: meeting.description,
            date: meeting.date,
            time: meeting.time,
            link: meeting.link,
            attendees: meeting.attendees,
            created_at: Utc::now(),
        };
        self.data.lock().await.meetings.push(record.clone());
        Ok(record)
    }

    async fn list_meetings(&self) -> PortResult<Vec<Meeting>> {
        let mut meetings = self.data.lock().await.meetings.clone();
        meetings.sort_by(|a, b| (b.date, &b.time).cmp(&(a.date, &a.time)));
        Ok(meetings)
    }

    async fn get_meeting(&self, id: Uuid) -> PortResult<Meeting> {
        let data = self.data.lock().await;
        data.meetings
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| not_found("Meeting", id))
    }

    async fn delete_meeting(&self, id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        remove_by(&mut data.meetings, "Meeting", id, |m| m.id)
    }

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        let record = Notification {
            id: Uuid::new_v4(),
            trainer_id: notification.trainer_id,
            meeting_id: notification.meeting_id,
            title: notification.title,
            message: notification.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.data.lock().await.notifications.push(record.clone());
        Ok(record)
    }

    async fn list_notifications(&self, trainer_id: Uuid) -> PortResult<Vec<Notification>> {
        let data = self.data.lock().await;
        // Pushed in creation order, so reversing yields newest first.
        Ok(data
            .notifications
            .iter()
            .rev()
            .filter(|n| n.trainer_id == trainer_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: Uuid) -> PortResult<Notification> {
        let mut data = self.data.lock().await;
        let notification = data
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| not_found("Notification", id))?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    // --- Reviews ---
    async fn create_review(&self, review: NewReview) -> PortResult<Review> {
        let now = Utc::now();
        let record = Review {
            id: Uuid::new_v4(),
            student_name: review.student_name,
            role: review.role,
            review_text: review.review_text,
            rating: review.rating,
            student_image: review.student_image,
            image_public_id: review.image_public_id,
            is_approved: review.is_approved,
            created_at: now,
            updated_at: now,
        };
        self.data.lock().await.reviews.push(record.clone());
        Ok(record)
    }

    async fn list_reviews(&self, approved_only: bool) -> PortResult<Vec<Review>> {
        let data = self.data.lock().await;
        Ok(data
            .reviews
            .iter()
            .rev()
            .filter(|r| !approved_only || r.is_approved)
            .cloned()
            .collect())
    }

    async fn get_review(&self, id: Uuid) -> PortResult<Review> {
        let data = self.data.lock().await;
        data.reviews
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("Review", id))
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> PortResult<ReviewUpdate> {
        let mut data = self.data.lock().await;
        let review = data
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("Review", id))?;
        let replaced_image = review.apply(changes, Utc::now());
        Ok(ReviewUpdate {
            review: review.clone(),
            replaced_image,
        })
    }

    async fn delete_review(&self, id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        remove_by(&mut data.reviews, "Review", id, |r| r.id)
    }

    // --- Typing Practice ---
    async fn save_typing_history(&self, entry: NewTypingHistory) -> PortResult<TypingHistory> {
        let record = TypingHistory {
            id: Uuid::new_v4(),
            student_id: entry.student_id,
            mode: entry.mode,
            lesson_title: entry.lesson_title,
            wpm: entry.wpm,
            accuracy: entry.accuracy,
            duration_seconds: entry.duration_seconds,
            correct_chars: entry.correct_chars,
            incorrect_chars: entry.incorrect_chars,
            errors: entry.errors,
            created_at: Utc::now(),
        };
        self.data.lock().await.typing_history.push(record.clone());
        Ok(record)
    }

    async fn list_typing_history(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<TypingHistory>> {
        let data = self.data.lock().await;
        Ok(data
            .typing_history
            .iter()
            .rev()
            .filter(|h| h.student_id == student_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_typing_progress(&self, entry: NewTypingProgress) -> PortResult<TypingProgress> {
        let record = TypingProgress {
            id: Uuid::new_v4(),
            student_id: entry.student_id,
            wpm: entry.wpm,
            accuracy: entry.accuracy,
            lesson: entry.lesson,
            mode: entry.mode,
            created_at: Utc::now(),
        };
        self.data.lock().await.typing_progress.push(record.clone());
        Ok(record)
    }

    async fn list_typing_progress(
        &self,
        student_id: Option<&str>,
    ) -> PortResult<Vec<TypingProgress>> {
        let data = self.data.lock().await;
        Ok(data
            .typing_progress
            .iter()
            .rev()
            .filter(|p| student_id.map_or(true, |id| p.student_id == id))
            .cloned()
            .collect())
    }

    async fn create_typing_lesson(&self, lesson: NewTypingLesson) -> PortResult<TypingLesson> {
        let record = TypingLesson {
            id: Uuid::new_v4(),
            title: lesson.title,
            content: lesson.content,
            difficulty: lesson.difficulty,
            created_at: Utc::now(),
        };
        self.data.lock().await.typing_lessons.push(record.clone());
        Ok(record)
    }

    async fn list_typing_lessons(&self) -> PortResult<Vec<TypingLesson>> {
        Ok(self.data.lock().await.typing_lessons.clone())
    }

    async fn get_typing_lesson(&self, id: Uuid) -> PortResult<TypingLesson> {
        let data = self.data.lock().await;
        data.typing_lessons
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found("Lesson", id))
    }

    // --- Demo Slots & Bookings ---
    async fn create_demo_slot(&self, slot: NewDemoSlot) -> PortResult<DemoSlot> {
        let mut data = self.data.lock().await;
        if data
            .demo_slots
            .iter()
            .any(|s| s.date == slot.date && s.time == slot.time)
        {
            return Err(PortError::Conflict(format!(
                "A slot already exists for {} at {}",
                slot.date, slot.time
            )));
        }
        let record = DemoSlot {
            id: Uuid::new_v4(),
            date: slot.date,
            time: slot.time,
            is_booked: false,
        };
        data.demo_slots.push(record.clone());
        Ok(record)
    }

    async fn list_demo_slots(&self, available_only: bool) -> PortResult<Vec<DemoSlot>> {
        let data = self.data.lock().await;
        let mut slots: Vec<DemoSlot> = data
            .demo_slots
            .iter()
            .filter(|s| !available_only || !s.is_booked)
            .cloned()
            .collect();
        slots.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
        Ok(slots)
    }

    async fn delete_demo_slot(&self, id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        remove_by(&mut data.demo_slots, "Slot", id, |s| s.id)
    }

    async fn book_demo(&self, booking: NewDemoBooking) -> PortResult<BookingOutcome> {
        let mut data = self.data.lock().await;

        let reserved_slot = match data
            .demo_slots
            .iter_mut()
            .find(|s| s.date == booking.date && s.time == booking.time_slot)
        {
            Some(slot) if slot.is_booked => {
                return Err(PortError::Conflict(format!(
                    "The {} slot on {} is already booked",
                    booking.time_slot, booking.date
                )));
            }
            Some(slot) => {
                slot.is_booked = true;
                Some(slot.id)
            }
            None => None,
        };

        let record = DemoBooking {
            id: Uuid::new_v4(),
            name: booking.name,
            email: booking.email,
            phone: booking.phone,
            course: booking.course,
            education: booking.education,
            date: booking.date,
            time_slot: booking.time_slot,
            created_at: Utc::now(),
        };
        data.demo_bookings.push(record.clone());
        Ok(BookingOutcome {
            booking: record,
            reserved_slot,
        })
    }

    async fn list_demo_bookings(&self) -> PortResult<Vec<DemoBooking>> {
        Ok(self.data.lock().await.demo_bookings.iter().rev().cloned().collect())
    }

    // --- Interviews ---
    async fn save_interview(&self, interview: NewInterview) -> PortResult<Interview> {
        let mut data = self.data.lock().await;
        if data.interviews.iter().any(|i| i.call_id == interview.call_id) {
            return Err(PortError::Conflict(format!(
                "Interview for call {} already recorded",
                interview.call_id
            )));
        }
        let record = Interview {
            id: Uuid::new_v4(),
            student_id: interview.student_id,
            call_id: interview.call_id,
            transcript: interview.transcript,
            summary: interview.summary,
            feedback: interview.feedback,
            score: interview.score,
            duration_seconds: interview.duration_seconds,
            recording_url: interview.recording_url,
            status: interview.status,
            created_at: Utc::now(),
        };
        data.interviews.push(record.clone());
        Ok(record)
    }

    async fn find_interview_by_call(&self, call_id: &str) -> PortResult<Option<Interview>> {
        let data = self.data.lock().await;
        Ok(data.interviews.iter().find(|i| i.call_id == call_id).cloned())
    }

    async fn list_interviews(&self, student_id: Uuid) -> PortResult<Vec<Interview>> {
        let data = self.data.lock().await;
        Ok(data
            .interviews
            .iter()
            .rev()
            .filter(|i| i.student_id == student_id)
            .cloned()
            .collect())
    }

    // --- Jobs ---
    async fn create_job(&self, job: NewJob) -> PortResult<Job> {
        let record = Job {
            id: Uuid::new_v4(),
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            apply_link: job.apply_link,
            is_student_only: job.is_student_only,
            created_at: Utc::now(),
        };
        self.data.lock().await.jobs.push(record.clone());
        Ok(record)
    }

    async fn list_jobs(&self, student_only: Option<bool>) -> PortResult<Vec<Job>> {
        let data = self.data.lock().await;
        Ok(data
            .jobs
            .iter()
            .rev()
            .filter(|j| student_only.map_or(true, |flag| j.is_student_only == flag))
            .cloned()
            .collect())
    }

    async fn get_job(&self, id: Uuid) -> PortResult<Job> {
        let data = self.data.lock().await;
        data.jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| not_found("Job", id))
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> PortResult<Job> {
        let mut data = self.data.lock().await;
        let job = data
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| not_found("Job", id))?;
        job.apply(changes);
        Ok(job.clone())
    }

    async fn delete_job(&self, id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        remove_by(&mut data.jobs, "Job", id, |j| j.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::domain::{InterviewStatus, StoredImage};
    use chrono::NaiveDate;

    fn booking(date: NaiveDate, time: &str) -> NewDemoBooking {
        NewDemoBooking {
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            phone: "9999999999".into(),
            course: None,
            education: None,
            date,
            time_slot: time.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_slots_are_rejected() {
        let db = InMemoryDb::new();
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let slot = NewDemoSlot { date, time: "10:00 AM".into() };
        db.create_demo_slot(slot.clone()).await.unwrap();
        assert!(matches!(db.create_demo_slot(slot).await, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn booking_flips_the_matching_slot_once() {
        let db = InMemoryDb::new();
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let slot = db
            .create_demo_slot(NewDemoSlot { date, time: "10:00 AM".into() })
            .await
            .unwrap();

        let first = db.book_demo(booking(date, "10:00 AM")).await.unwrap();
        assert_eq!(first.reserved_slot, Some(slot.id));

        let second = db.book_demo(booking(date, "10:00 AM")).await;
        assert!(matches!(second, Err(PortError::Conflict(_))));
        assert_eq!(db.booking_count().await, 1);
    }

    #[tokio::test]
    async fn booking_without_a_slot_is_still_recorded() {
        let db = InMemoryDb::new();
        let date = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();
        let outcome = db.book_demo(booking(date, "04:00 PM")).await.unwrap();
        assert!(outcome.reserved_slot.is_none());
        assert_eq!(db.list_demo_bookings().await.unwrap().len(), 1);
    }

    fn image(public_id: &str) -> StoredImage {
        StoredImage {
            url: format!("https://img.test/{}.png", public_id),
            public_id: public_id.into(),
        }
    }

    #[tokio::test]
    async fn review_update_reports_the_image_it_displaced() {
        let db = InMemoryDb::new();
        let review = db
            .create_review(NewReview {
                student_name: "Asha".into(),
                role: "Student".into(),
                review_text: "Great course".into(),
                rating: 5,
                student_image: "https://img.test/img-1.png".into(),
                image_public_id: "img-1".into(),
                is_approved: true,
            })
            .await
            .unwrap();

        let text_only = db
            .update_review(
                review.id,
                ReviewChanges {
                    rating: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(text_only.replaced_image, None);

        let first = db
            .update_review(
                review.id,
                ReviewChanges {
                    image: Some(image("img-2")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.replaced_image.as_deref(), Some("img-1"));

        let second = db
            .update_review(
                review.id,
                ReviewChanges {
                    image: Some(image("img-3")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.replaced_image.as_deref(), Some("img-2"));
        assert_eq!(second.review.image_public_id, "img-3");
    }

    #[tokio::test]
    async fn interviews_are_found_by_call_id() {
        let db = InMemoryDb::new();
        let student_id = Uuid::new_v4();
        db.save_interview(NewInterview {
            student_id,
            call_id: "call-9".into(),
            transcript: "AI: Hi".into(),
            summary: None,
            feedback: None,
            score: None,
            duration_seconds: 60,
            recording_url: None,
            status: InterviewStatus::Completed,
        })
        .await
        .unwrap();

        let found = db.find_interview_by_call("call-9").await.unwrap();
        assert_eq!(found.map(|i| i.student_id), Some(student_id));
        assert!(db.find_interview_by_call("call-10").await.unwrap().is_none());
    }
}
