//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use academy_core::ports::{
    AttemptCounter, DatabaseService, ImageStore, InterviewFeedbackService, MailService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn MailService>,
    pub images: Arc<dyn ImageStore>,
    /// Absent when no language model is configured; interviews are then stored without feedback.
    pub feedback: Option<Arc<dyn InterviewFeedbackService>>,
    pub interview_attempts: Arc<dyn AttemptCounter>,
}
