//! services/api/src/web/people.rs
//!
//! Admin management of trainers and students.

use academy_core::domain::{NewStudent, NewTrainer, Student, Trainer, TrainerStatus};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::params::{json_body, non_blank, FieldErrors, ValidPath, ValidQuery};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// `active` or `inactive`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Trainer> for TrainerResponse {
    fn from(t: Trainer) -> Self {
        Self {
            id: t.id,
            name: t.name,
            email: t.email,
            status: t.status.as_str().to_string(),
            created_at: t.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrainerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Defaults to `active`.
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTrainerStatusRequest {
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct TrainerFilter {
    /// Only list trainers with this status.
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            phone: s.phone,
            course: s.course,
            created_at: s.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
}

fn parse_status(raw: Option<String>) -> Option<Option<TrainerStatus>> {
    match non_blank(raw) {
        None => Some(None),
        Some(s) => s.parse().ok().map(Some),
    }
}

/// Emails are unique per person and compared in lower case.
fn plausible_email(raw: Option<String>) -> Option<String> {
    non_blank(raw)
        .filter(|e| e.contains('@'))
        .map(|e| e.to_lowercase())
}

//=========================================================================================
// Trainer Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/admin/trainers",
    params(TrainerFilter),
    responses(
        (status = 200, description = "Trainers by name", body = [TrainerResponse]),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_trainers_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(filter): ValidQuery<TrainerFilter>,
) -> ApiResult<Json<Vec<TrainerResponse>>> {
    let Some(status) = parse_status(filter.status) else {
        let mut errors = FieldErrors::new();
        errors.reject("status");
        return Err(errors.into_error());
    };
    let trainers = state.db.list_trainers(status).await?;
    Ok(Json(trainers.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/trainers",
    request_body = CreateTrainerRequest,
    responses(
        (status = 201, description = "Trainer created", body = TrainerResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_trainer_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTrainerRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let name = non_blank(req.name);
    let email = plausible_email(req.email);
    let status = parse_status(req.status);

    let mut errors = FieldErrors::new();
    errors.check("name", &name);
    errors.check("email", &email);
    errors.check("status", &status);
    let (Some(name), Some(email), Some(status)) = (name, email, status) else {
        return Err(errors.into_error());
    };

    let trainer = state
        .db
        .create_trainer(NewTrainer {
            name,
            email,
            status: status.unwrap_or(TrainerStatus::Active),
        })
        .await?;
    info!(trainer_id = %trainer.id, "Trainer created");
    Ok((StatusCode::CREATED, Json(TrainerResponse::from(trainer))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/trainers/{id}/status",
    params(("id" = Uuid, Path, description = "Trainer id")),
    request_body = UpdateTrainerStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TrainerResponse),
        (status = 400, description = "Missing or unknown status"),
        (status = 404, description = "No such trainer")
    )
)]
pub async fn update_trainer_status_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    body: Result<Json<UpdateTrainerStatusRequest>, JsonRejection>,
) -> ApiResult<Json<TrainerResponse>> {
    let req = json_body(body)?;
    let Some(status) = non_blank(req.status).and_then(|s| s.parse::<TrainerStatus>().ok()) else {
        let mut errors = FieldErrors::new();
        errors.reject("status");
        return Err(errors.into_error());
    };

    let trainer = state.db.update_trainer_status(id, status).await?;
    info!(trainer_id = %id, status = status.as_str(), "Trainer status changed");
    Ok(Json(trainer.into()))
}

//=========================================================================================
// Student Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/admin/students",
    responses((status = 200, description = "Students, newest first", body = [StudentResponse]))
)]
pub async fn list_students_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<StudentResponse>>> {
    let students = state.db.list_students().await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let name = non_blank(req.name);
    let email = plausible_email(req.email);

    let mut errors = FieldErrors::new();
    errors.check("name", &name);
    errors.check("email", &email);
    let (Some(name), Some(email)) = (name, email) else {
        return Err(errors.into_error());
    };

    let student = state
        .db
        .create_student(NewStudent {
            name,
            email,
            phone: non_blank(req.phone),
            course: non_blank(req.course),
        })
        .await?;
    info!(student_id = %student.id, "Student created");
    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

#[utoipa::path(
    get,
    path = "/api/admin/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "The student", body = StudentResponse),
        (status = 404, description = "No such student")
    )
)]
pub async fn get_student_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<StudentResponse>> {
    Ok(Json(state.db.get_student(id).await?.into()))
}
