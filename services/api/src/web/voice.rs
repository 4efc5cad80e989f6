//! services/api/src/web/voice.rs
//!
//! Mock interviews run by a hosted voice agent. Students start a session here, the
//! agent reports the finished call to the webhook, and the transcript is scored by the
//! feedback model before it is stored.

use academy_core::domain::{
    AttemptDecision, Interview, InterviewStatus, NewInterview, DAILY_INTERVIEW_LIMIT,
};
use academy_core::ports::PortError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::params::{json_body, non_blank, secrets_match, FieldErrors, ValidPath};
use crate::web::state::AppState;

/// Header the voice agent uses to present the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-vapi-secret";

const END_OF_CALL_REPORT: &str = "end-of-call-report";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewRequest {
    pub student_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallMetadata {
    pub student_id: Uuid,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewResponse {
    pub assistant_id: String,
    /// Where the voice agent must deliver its call reports.
    pub webhook_url: String,
    /// Attached to the call so the report can be matched to the student.
    pub metadata: CallMetadata,
    pub attempts_used: u32,
    pub attempts_remaining: u32,
}

/// The subset of a voice-agent server message this service reads.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub message: WebhookMessage,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub call: WebhookCall,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub recording_url: Option<String>,
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub artifact: WebhookArtifact,
    #[serde(default)]
    pub analysis: WebhookAnalysis,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookCall {
    pub id: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookArtifact {
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookAnalysis {
    pub summary: Option<String>,
}

impl WebhookMessage {
    fn student_id(&self) -> Option<Uuid> {
        self.call
            .metadata
            .as_ref()?
            .get("studentId")?
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
    }

    fn transcript(&self) -> String {
        non_blank(self.transcript.clone())
            .or_else(|| non_blank(self.artifact.transcript.clone()))
            .unwrap_or_default()
    }

    fn summary(&self) -> Option<String> {
        non_blank(self.summary.clone()).or_else(|| non_blank(self.analysis.summary.clone()))
    }

    fn recording_url(&self) -> Option<String> {
        non_blank(self.recording_url.clone())
            .or_else(|| non_blank(self.artifact.recording_url.clone()))
    }

    fn duration_seconds(&self) -> u32 {
        self.duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u32)
            .unwrap_or(0)
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<Uuid>,
}

impl WebhookAck {
    fn ignored() -> Json<Self> {
        Json(Self {
            received: true,
            interview_id: None,
        })
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub call_id: String,
    pub transcript: String,
    pub summary: Option<String>,
    pub feedback: Option<String>,
    pub score: Option<u8>,
    pub duration_seconds: u32,
    pub recording_url: Option<String>,
    /// `completed` or `failed`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Interview> for InterviewResponse {
    fn from(i: Interview) -> Self {
        Self {
            id: i.id,
            student_id: i.student_id,
            call_id: i.call_id,
            transcript: i.transcript,
            summary: i.summary,
            feedback: i.feedback,
            score: i.score,
            duration_seconds: i.duration_seconds,
            recording_url: i.recording_url,
            status: i.status.as_str().to_string(),
            created_at: i.created_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Start a mock interview. Each student may start three per UTC day.
#[utoipa::path(
    post,
    path = "/api/voice/start-interview",
    request_body = StartInterviewRequest,
    responses(
        (status = 200, description = "Session parameters for the voice agent", body = StartInterviewResponse),
        (status = 400, description = "Missing or invalid studentId"),
        (status = 429, description = "Daily interview limit reached"),
        (status = 503, description = "Voice agent not configured")
    )
)]
pub async fn start_interview_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartInterviewRequest>, JsonRejection>,
) -> ApiResult<Json<StartInterviewResponse>> {
    let req = json_body(body)?;

    let student_id = non_blank(req.student_id).and_then(|s| Uuid::parse_str(&s).ok());
    let mut errors = FieldErrors::new();
    errors.check("studentId", &student_id);
    let Some(student_id) = student_id else {
        return Err(errors.into_error());
    };

    let Some(assistant_id) = state.config.voice.assistant_id.clone() else {
        return Err(ApiError::Unavailable(
            "The interview voice agent is not configured".to_string(),
        ));
    };

    let today = Utc::now().date_naive();
    let decision = state
        .interview_attempts
        .try_record(&student_id.to_string(), today, DAILY_INTERVIEW_LIMIT)
        .await?;

    let used = match decision {
        AttemptDecision::Allowed { used } => used,
        AttemptDecision::Rejected { used } => {
            info!(student_id = %student_id, used, "Daily interview limit reached");
            return Err(ApiError::RateLimited(format!(
                "You can start at most {} interviews per day. Try again tomorrow.",
                DAILY_INTERVIEW_LIMIT
            )));
        }
    };

    info!(student_id = %student_id, attempt = used, "Interview session started");
    Ok(Json(StartInterviewResponse {
        assistant_id,
        webhook_url: state.config.voice_webhook_url(),
        metadata: CallMetadata { student_id },
        attempts_used: used,
        attempts_remaining: DAILY_INTERVIEW_LIMIT.saturating_sub(used),
    }))
}

/// Receives call reports from the voice agent.
#[utoipa::path(
    post,
    path = "/api/voice/vapi-webhook",
    request_body = WebhookEnvelope,
    params(("x-vapi-secret" = String, Header, description = "Shared webhook secret")),
    responses(
        (status = 200, description = "Report acknowledged", body = WebhookAck),
        (status = 401, description = "Missing or wrong webhook secret")
    )
)]
pub async fn vapi_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<WebhookEnvelope>, JsonRejection>,
) -> ApiResult<Json<WebhookAck>> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    let authorised = match (provided, state.config.voice.webhook_secret.as_deref()) {
        (Some(provided), Some(expected)) => secrets_match(provided, expected),
        _ => false,
    };
    if !authorised {
        warn!("Rejected voice webhook with a missing or invalid secret");
        return Err(ApiError::Unauthorized);
    }

    let message = json_body(body)?.message;
    if message.kind != END_OF_CALL_REPORT {
        return Ok(WebhookAck::ignored());
    }

    let Some(student_id) = message.student_id() else {
        warn!(call_id = ?message.call.id, "Call report without a valid studentId; not stored");
        return Ok(WebhookAck::ignored());
    };
    let Some(call_id) = non_blank(message.call.id.clone()) else {
        warn!(student_id = %student_id, "Call report without a call id; not stored");
        return Ok(WebhookAck::ignored());
    };

    if let Some(existing) = state.db.find_interview_by_call(&call_id).await? {
        info!(
            call_id = %call_id,
            interview_id = %existing.id,
            "Duplicate call report acknowledged"
        );
        return Ok(Json(WebhookAck {
            received: true,
            interview_id: Some(existing.id),
        }));
    }

    let transcript = message.transcript();
    let status = if transcript.is_empty() {
        InterviewStatus::Failed
    } else {
        InterviewStatus::Completed
    };

    let mut feedback = None;
    let mut score = None;
    if let (Some(model), false) = (state.feedback.as_ref(), transcript.is_empty()) {
        match model.evaluate_transcript(&transcript).await {
            Ok(evaluation) => {
                feedback = Some(evaluation.feedback);
                score = Some(evaluation.score);
            }
            Err(e) => warn!(call_id = %call_id, error = %e, "Interview feedback generation failed"),
        }
    }

    let saved = state
        .db
        .save_interview(NewInterview {
            student_id,
            call_id: call_id.clone(),
            summary: message.summary(),
            recording_url: message.recording_url(),
            duration_seconds: message.duration_seconds(),
            transcript,
            feedback,
            score,
            status,
        })
        .await;

    match saved {
        Ok(interview) => {
            info!(
                interview_id = %interview.id,
                student_id = %student_id,
                status = status.as_str(),
                "Interview stored"
            );
            Ok(Json(WebhookAck {
                received: true,
                interview_id: Some(interview.id),
            }))
        }
        Err(PortError::Conflict(_)) => {
            info!(call_id = %call_id, "Concurrent duplicate call report acknowledged");
            Ok(WebhookAck::ignored())
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/voice/history/{student_id}",
    params(("student_id" = Uuid, Path, description = "Student id")),
    responses((status = 200, description = "Interviews, newest first", body = [InterviewResponse]))
)]
pub async fn interview_history_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(student_id): ValidPath<Uuid>,
) -> ApiResult<Json<Vec<InterviewResponse>>> {
    let interviews = state.db.list_interviews(student_id).await?;
    Ok(Json(interviews.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> WebhookMessage {
        serde_json::from_str::<WebhookEnvelope>(body).unwrap().message
    }

    #[test]
    fn reads_fields_from_artifact_and_analysis() {
        let student = Uuid::new_v4();
        let message = parse(&format!(
            r#"{{"message": {{
                "type": "end-of-call-report",
                "call": {{"id": "call-1", "metadata": {{"studentId": "{student}"}}}},
                "artifact": {{"transcript": "AI: Hi\nUser: Hello", "recordingUrl": "https://rec/1"}},
                "analysis": {{"summary": "Short call"}},
                "durationSeconds": 61.6
            }}}}"#
        ));
        assert_eq!(message.student_id(), Some(student));
        assert_eq!(message.transcript(), "AI: Hi\nUser: Hello");
        assert_eq!(message.summary().as_deref(), Some("Short call"));
        assert_eq!(message.recording_url().as_deref(), Some("https://rec/1"));
        assert_eq!(message.duration_seconds(), 62);
    }

    #[test]
    fn non_uuid_student_ids_are_ignored() {
        let message = parse(
            r#"{"message": {"type": "end-of-call-report", "call": {"id": "c", "metadata": {"studentId": 42}}}}"#,
        );
        assert_eq!(message.student_id(), None);
        assert_eq!(message.transcript(), "");
    }

    #[test]
    fn other_message_types_parse_without_a_call() {
        let message = parse(r#"{"message": {"type": "status-update", "status": "in-progress"}}"#);
        assert_eq!(message.kind, "status-update");
        assert!(message.call.id.is_none());
    }
}
