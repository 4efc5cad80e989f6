//! services/api/src/web/typing.rs
//!
//! Typing practice: result submission with the legacy progress mirror, session
//! history and statistics, lessons, and the loosely typed legacy endpoints that older
//! clients still call.

use academy_core::domain::{
    NewTypingHistory, NewTypingLesson, NewTypingProgress, TypingHistory, TypingLesson, TypingMode,
    TypingProgress, TypingSummary,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::params::{
    flexible_f64, json_body, non_blank, FieldErrors, ValidPath, ValidQuery,
};
use crate::web::state::AppState;

pub const DEFAULT_SESSION_LIMIT: usize = 50;
pub const MAX_SESSION_LIMIT: usize = 500;

const DEFAULT_DIFFICULTY: &str = "beginner";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTypingRequest {
    pub student_id: Option<String>,
    /// `lesson`, `practice` or `test`. Defaults to `practice`.
    pub mode: Option<String>,
    pub lesson_title: Option<String>,
    pub wpm: Option<f64>,
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub correct_chars: u32,
    #[serde(default)]
    pub incorrect_chars: u32,
    /// Mistyped character -> miss count.
    #[serde(default)]
    pub errors: BTreeMap<String, u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingHistoryResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mode: String,
    pub lesson_title: Option<String>,
    pub wpm: f64,
    pub accuracy: f64,
    pub duration_seconds: u32,
    pub correct_chars: u32,
    pub incorrect_chars: u32,
    pub errors: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
}

impl From<TypingHistory> for TypingHistoryResponse {
    fn from(h: TypingHistory) -> Self {
        Self {
            id: h.id,
            student_id: h.student_id,
            mode: h.mode.as_str().to_string(),
            lesson_title: h.lesson_title,
            wpm: h.wpm,
            accuracy: h.accuracy,
            duration_seconds: h.duration_seconds,
            correct_chars: h.correct_chars,
            incorrect_chars: h.incorrect_chars,
            errors: h.errors,
            created_at: h.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingSummaryResponse {
    pub count: usize,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub max_wpm: f64,
}

impl From<TypingSummary> for TypingSummaryResponse {
    fn from(s: TypingSummary) -> Self {
        Self {
            count: s.count,
            average_wpm: s.average_wpm,
            average_accuracy: s.average_accuracy,
            max_wpm: s.max_wpm,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TypingSessionsResponse {
    pub sessions: Vec<TypingHistoryResponse>,
    pub summary: TypingSummaryResponse,
}

#[derive(Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Page size, default 50, at most 500.
    pub limit: Option<usize>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingLessonResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

impl From<TypingLesson> for TypingLessonResponse {
    fn from(l: TypingLesson) -> Self {
        Self {
            id: l.id,
            title: l.title,
            content: l.content,
            difficulty: l.difficulty,
            created_at: l.created_at,
        }
    }
}

/// Legacy payload. Numbers may arrive as numeric strings.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LegacySaveRequest {
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    #[schema(value_type = Option<f64>)]
    pub wpm: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    #[schema(value_type = Option<f64>)]
    pub accuracy: Option<f64>,
    pub lesson: Option<String>,
    pub mode: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingProgressResponse {
    pub id: Uuid,
    pub student_id: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub lesson: Option<String>,
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<TypingProgress> for TypingProgressResponse {
    fn from(p: TypingProgress) -> Self {
        Self {
            id: p.id,
            student_id: p.student_id,
            wpm: p.wpm,
            accuracy: p.accuracy,
            lesson: p.lesson,
            mode: p.mode,
            created_at: p.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    /// Restrict the figures to one student.
    pub student_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingAnalyticsResponse {
    pub count: usize,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub best_wpm: f64,
}

fn valid_wpm(wpm: Option<f64>) -> Option<f64> {
    wpm.filter(|w| w.is_finite() && *w >= 0.0)
}

fn valid_accuracy(accuracy: Option<f64>) -> Option<f64> {
    accuracy.filter(|a| (0.0..=100.0).contains(a))
}

//=========================================================================================
// Submission & Sessions
//=========================================================================================

/// Record a typing result and mirror it into the legacy progress collection.
#[utoipa::path(
    post,
    path = "/api/typing/submit",
    request_body = SubmitTypingRequest,
    responses(
        (status = 201, description = "Result stored", body = TypingHistoryResponse),
        (status = 400, description = "Missing or invalid fields")
    )
)]
pub async fn submit_typing_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitTypingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let student_id = non_blank(req.student_id).and_then(|s| Uuid::parse_str(&s).ok());
    let mode = match non_blank(req.mode) {
        None => Some(TypingMode::Practice),
        Some(m) => m.parse::<TypingMode>().ok(),
    };
    let wpm = valid_wpm(req.wpm);
    let accuracy = valid_accuracy(req.accuracy);

    let mut errors = FieldErrors::new();
    errors.check("studentId", &student_id);
    errors.check("mode", &mode);
    errors.check("wpm", &wpm);
    errors.check("accuracy", &accuracy);
    let (Some(student_id), Some(mode), Some(wpm), Some(accuracy)) =
        (student_id, mode, wpm, accuracy)
    else {
        return Err(errors.into_error());
    };

    let history = state
        .db
        .save_typing_history(NewTypingHistory {
            student_id,
            mode,
            lesson_title: non_blank(req.lesson_title),
            wpm,
            accuracy,
            duration_seconds: req.duration_seconds,
            correct_chars: req.correct_chars,
            incorrect_chars: req.incorrect_chars,
            errors: req.errors,
        })
        .await?;

    if let Err(e) = state
        .db
        .save_typing_progress(NewTypingProgress::from(&history))
        .await
    {
        warn!(student_id = %student_id, error = %e, "Failed to mirror typing result into legacy progress");
    }

    info!(student_id = %student_id, mode = %mode, wpm, "Typing result recorded");
    Ok((StatusCode::CREATED, Json(TypingHistoryResponse::from(history))))
}

/// A student's recent results with aggregate statistics over the returned page.
#[utoipa::path(
    get,
    path = "/api/typing/sessions/{student_id}",
    params(("student_id" = Uuid, Path, description = "Student id"), SessionQuery),
    responses((status = 200, description = "Newest first", body = TypingSessionsResponse))
)]
pub async fn typing_sessions_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(student_id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> ApiResult<Json<TypingSessionsResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SESSION_LIMIT)
        .clamp(1, MAX_SESSION_LIMIT);
    let sessions = state.db.list_typing_history(student_id, limit).await?;
    let summary = TypingSummary::from_samples(sessions.iter().map(|s| (s.wpm, s.accuracy)));

    Ok(Json(TypingSessionsResponse {
        sessions: sessions.into_iter().map(Into::into).collect(),
        summary: summary.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/typing/last/{student_id}",
    params(("student_id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "The newest result", body = TypingHistoryResponse),
        (status = 404, description = "The student has no results yet")
    )
)]
pub async fn last_typing_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(student_id): ValidPath<Uuid>,
) -> ApiResult<Json<TypingHistoryResponse>> {
    state
        .db
        .list_typing_history(student_id, 1)
        .await?
        .into_iter()
        .next()
        .map(|h| Json(h.into()))
        .ok_or_else(|| ApiError::NotFound(format!("No typing results for student {}", student_id)))
}

//=========================================================================================
// Lessons
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/typing/lessons",
    responses((status = 200, description = "All lessons", body = [TypingLessonResponse]))
)]
pub async fn list_lessons_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<TypingLessonResponse>>> {
    let lessons = state.db.list_typing_lessons().await?;
    Ok(Json(lessons.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/typing/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "The lesson", body = TypingLessonResponse),
        (status = 404, description = "No such lesson")
    )
)]
pub async fn get_lesson_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<TypingLessonResponse>> {
    Ok(Json(state.db.get_typing_lesson(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/typing/lessons",
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = TypingLessonResponse),
        (status = 400, description = "Missing fields")
    )
)]
pub async fn create_lesson_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateLessonRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let title = non_blank(req.title);
    let content = non_blank(req.content);

    let mut errors = FieldErrors::new();
    errors.check("title", &title);
    errors.check("content", &content);
    let (Some(title), Some(content)) = (title, content) else {
        return Err(errors.into_error());
    };

    let lesson = state
        .db
        .create_typing_lesson(NewTypingLesson {
            title,
            content,
            difficulty: non_blank(req.difficulty).unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        })
        .await?;
    info!(lesson_id = %lesson.id, "Typing lesson created");
    Ok((StatusCode::CREATED, Json(TypingLessonResponse::from(lesson))))
}

//=========================================================================================
// Legacy Endpoints
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/typing/save",
    request_body = LegacySaveRequest,
    responses(
        (status = 201, description = "Progress stored", body = TypingProgressResponse),
        (status = 400, description = "Missing or invalid fields")
    )
)]
pub async fn legacy_save_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LegacySaveRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let student_id = non_blank(req.student_id);
    let wpm = valid_wpm(req.wpm);
    let accuracy = valid_accuracy(req.accuracy);

    let mut errors = FieldErrors::new();
    errors.check("studentId", &student_id);
    errors.check("wpm", &wpm);
    errors.check("accuracy", &accuracy);
    let (Some(student_id), Some(wpm), Some(accuracy)) = (student_id, wpm, accuracy) else {
        return Err(errors.into_error());
    };

    let progress = state
        .db
        .save_typing_progress(NewTypingProgress {
            student_id,
            wpm,
            accuracy,
            lesson: non_blank(req.lesson),
            mode: non_blank(req.mode),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(TypingProgressResponse::from(progress))))
}

#[utoipa::path(
    get,
    path = "/api/typing/history/{student_id}",
    params(("student_id" = String, Path, description = "Student id as stored by legacy clients")),
    responses((status = 200, description = "Newest first", body = [TypingProgressResponse]))
)]
pub async fn legacy_history_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(student_id): ValidPath<String>,
) -> ApiResult<Json<Vec<TypingProgressResponse>>> {
    let rows = state.db.list_typing_progress(Some(&student_id)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/typing/analytics",
    params(AnalyticsQuery),
    responses((status = 200, description = "Aggregate progress figures", body = TypingAnalyticsResponse))
)]
pub async fn legacy_analytics_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<AnalyticsQuery>,
) -> ApiResult<Json<TypingAnalyticsResponse>> {
    let student_id = non_blank(query.student_id);
    let rows = state.db.list_typing_progress(student_id.as_deref()).await?;
    let summary = TypingSummary::from_samples(rows.iter().map(|r| (r.wpm, r.accuracy)));

    Ok(Json(TypingAnalyticsResponse {
        count: summary.count,
        average_wpm: summary.average_wpm,
        average_accuracy: summary.average_accuracy,
        best_wpm: summary.max_wpm,
    }))
}
