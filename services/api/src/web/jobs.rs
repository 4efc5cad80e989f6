//! services/api/src/web/jobs.rs
//!
//! Job board: public listing and admin maintenance of openings.

use academy_core::domain::{Job, JobChanges, NewJob};
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
use crate::web::params::{
    flexible_bool, json_body, non_blank, FieldErrors, ValidPath, ValidQuery,
};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub apply_link: Option<String>,
    pub is_student_only: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            title: j.title,
            company: j.company,
            location: j.location,
            description: j.description,
            apply_link: j.apply_link,
            is_student_only: j.is_student_only,
            created_at: j.created_at,
        }
    }
}

/// Body for create and update. On update every field is optional.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub apply_link: Option<String>,
    /// Accepts `true`/`false`, `"true"`/`"false"`, `1`/`0` and `"yes"`/`"no"`.
    #[serde(default, deserialize_with = "flexible_bool")]
    #[schema(value_type = Option<bool>)]
    pub is_student_only: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    /// Only list openings restricted to enrolled students (`true`) or public ones (`false`).
    #[serde(default, deserialize_with = "flexible_bool")]
    #[param(value_type = Option<bool>)]
    pub student_only: Option<bool>,
}

//=========================================================================================
// Public Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(JobFilter),
    responses((status = 200, description = "Openings, newest first", body = [JobResponse]))
)]
pub async fn list_jobs_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(filter): ValidQuery<JobFilter>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    let jobs = state.db.list_jobs(filter.student_only).await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The opening", body = JobResponse),
        (status = 404, description = "No such job")
    )
)]
pub async fn get_job_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    Ok(Json(state.db.get_job(id).await?.into()))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/admin/jobs",
    request_body = JobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 400, description = "Missing or invalid fields")
    )
)]
pub async fn create_job_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let title = non_blank(req.title);
    let company = non_blank(req.company);

    let mut errors = FieldErrors::new();
    errors.check("title", &title);
    errors.check("company", &company);
    let (Some(title), Some(company)) = (title, company) else {
        return Err(errors.into_error());
    };

    let job = state
        .db
        .create_job(NewJob {
            title,
            company,
            location: non_blank(req.location),
            description: non_blank(req.description),
            apply_link: non_blank(req.apply_link),
            is_student_only: req.is_student_only.unwrap_or(false),
        })
        .await?;
    info!(job_id = %job.id, student_only = job.is_student_only, "Job created");
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

#[utoipa::path(
    put,
    path = "/api/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = JobRequest,
    responses(
        (status = 200, description = "Job updated", body = JobResponse),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "No such job")
    )
)]
pub async fn update_job_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<Json<JobResponse>> {
    let req = json_body(body)?;
    let changes = JobChanges {
        title: non_blank(req.title),
        company: non_blank(req.company),
        location: non_blank(req.location),
        description: non_blank(req.description),
        apply_link: non_blank(req.apply_link),
        is_student_only: req.is_student_only,
    };
    let job = state.db.update_job(id, changes).await?;
    info!(job_id = %id, "Job updated");
    Ok(Json(job.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 404, description = "No such job")
    )
)]
pub async fn delete_job_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_job(id).await?;
    info!(job_id = %id, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}
