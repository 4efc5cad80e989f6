pub mod domain;
pub mod ports;

pub use domain::{
    Attendees, AttemptDecision, BookingOutcome, DemoBooking, DemoSlot, Interview,
    InterviewFeedback, InterviewStatus, Job, Meeting, Notification, Review, ReviewUpdate,
    StoredImage, Student, Trainer, TrainerStatus, TypingHistory, TypingLesson, TypingMode,
    TypingProgress, TypingSummary,
};
pub use ports::{
    AttemptCounter, DatabaseService, ImageStore, InterviewFeedbackService, MailService, PortError,
    PortResult,
};
