//! services/api/src/web/reviews.rs
//!
//! Student testimonials. Creation and updates arrive as multipart forms carrying the
//! student's photo, which lives in the remote image store alongside the record.

use academy_core::domain::{NewReview, Review, ReviewChanges, StoredImage, MAX_RATING};
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::params::{non_blank, parse_bool, FieldErrors, ValidPath, ValidQuery};
use crate::web::state::AppState;

const DEFAULT_ROLE: &str = "Student";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
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

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            student_name: r.student_name,
            role: r.role,
            review_text: r.review_text,
            rating: r.rating,
            student_image: r.student_image,
            image_public_id: r.image_public_id,
            is_approved: r.is_approved,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Multipart form accepted by create and update. Only used for documentation.
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    student_name: Option<String>,
    role: Option<String>,
    review_text: Option<String>,
    rating: Option<u8>,
    is_approved: Option<bool>,
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
}

#[derive(Deserialize, IntoParams)]
pub struct ReviewFilter {
    /// `true` lists unapproved reviews as well.
    pub all: Option<String>,
}

//=========================================================================================
// Multipart parsing
//=========================================================================================

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Raw form values. Absent parts stay `None`; malformed ones are recorded in `invalid`.
#[derive(Default)]
struct ReviewFormData {
    student_name: Option<String>,
    role: Option<String>,
    review_text: Option<String>,
    rating: Option<u8>,
    is_approved: Option<bool>,
    image: Option<UploadedFile>,
    invalid: FieldErrors,
}

fn malformed(err: MultipartError) -> ApiError {
    ApiError::Validation {
        message: err.body_text(),
        fields: Vec::new(),
    }
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<ReviewFormData> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Validation {
        message: rejection.body_text(),
        fields: Vec::new(),
    })?;
    let mut form = ReviewFormData::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("review-image").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(malformed)?;
            if !data.is_empty() {
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        let value = non_blank(Some(value));
        match name.as_str() {
            "studentName" => form.student_name = value,
            "role" => form.role = value,
            "reviewText" => form.review_text = value,
            "rating" => {
                if let Some(raw) = value {
                    match raw.parse::<f64>() {
                        Ok(r) if (0.0..=f64::from(MAX_RATING)).contains(&r) => {
                            form.rating = Some(r.round() as u8)
                        }
                        _ => form.invalid.reject("rating"),
                    }
                }
            }
            "isApproved" => {
                if let Some(raw) = value {
                    match parse_bool(&raw) {
                        Some(b) => form.is_approved = Some(b),
                        None => form.invalid.reject("isApproved"),
                    }
                }
            }
            other => warn!(field = other, "Ignoring unknown review form field"),
        }
    }

    Ok(form)
}

async fn upload(state: &AppState, file: UploadedFile) -> ApiResult<StoredImage> {
    state
        .images
        .upload_image(&file.file_name, file.content_type.as_deref(), file.data)
        .await
        .map_err(|e| {
            error!(error = %e, "Review image upload failed");
            ApiError::Internal(format!("image upload failed: {}", e))
        })
}

/// Removes a remote image; failures are logged only.
async fn discard_image(state: &AppState, public_id: &str) {
    if public_id.is_empty() {
        return;
    }
    if let Err(e) = state.images.delete_image(public_id).await {
        warn!(public_id, error = %e, "Failed to delete review image");
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List reviews. Only approved reviews unless `?all=true`.
#[utoipa::path(
    get,
    path = "/api/reviews",
    params(ReviewFilter),
    responses((status = 200, description = "Reviews, newest first", body = [ReviewResponse]))
)]
pub async fn list_reviews_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(filter): ValidQuery<ReviewFilter>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let include_all = filter.all.as_deref().and_then(parse_bool).unwrap_or(false);
    let reviews = state.db.list_reviews(!include_all).await?;
    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body(content = ReviewForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 500, description = "Image upload failed")
    )
)]
pub async fn create_review_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart).await?;

    let mut errors = form.invalid;
    errors.check("studentName", &form.student_name);
    errors.check("reviewText", &form.review_text);
    errors.check("rating", &form.rating);
    errors.check("image", &form.image);
    let (Some(student_name), Some(review_text), Some(rating), Some(image)) =
        (form.student_name, form.review_text, form.rating, form.image)
    else {
        return Err(errors.into_error());
    };
    errors.finish()?;

    let stored = upload(&state, image).await?;

    let review = state
        .db
        .create_review(NewReview {
            student_name,
            role: form.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            review_text,
            rating,
            student_image: stored.url,
            image_public_id: stored.public_id.clone(),
            is_approved: form.is_approved.unwrap_or(true),
        })
        .await;

    match review {
        Ok(review) => {
            info!(review_id = %review.id, "Review created");
            Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
        }
        Err(e) => {
            discard_image(&state, &stored.public_id).await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body(content = ReviewForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "No such review"),
        (status = 500, description = "Image upload failed")
    )
)]
pub async fn update_review_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    let form = read_form(multipart).await?;
    form.invalid.finish()?;

    // Fail fast on an unknown id before uploading anything.
    state.db.get_review(id).await?;

    let image = match form.image {
        Some(file) => Some(upload(&state, file).await?),
        None => None,
    };
    let new_public_id = image.as_ref().map(|i| i.public_id.clone());

    let changes = ReviewChanges {
        student_name: form.student_name,
        role: form.role,
        review_text: form.review_text,
        rating: form.rating,
        image,
        is_approved: form.is_approved,
    };

    let update = match state.db.update_review(id, changes).await {
        Ok(update) => update,
        Err(e) => {
            if let Some(public_id) = new_public_id {
                discard_image(&state, &public_id).await;
            }
            return Err(e.into());
        }
    };

    let replaced_image = update.replaced_image.is_some();
    if let Some(public_id) = &update.replaced_image {
        discard_image(&state, public_id).await;
    }
    info!(review_id = %id, replaced_image, "Review updated");
    Ok(Json(update.review.into()))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 404, description = "No such review")
    )
)]
pub async fn delete_review_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<StatusCode> {
    let review = state.db.get_review(id).await?;
    discard_image(&state, &review.image_public_id).await;
    state.db.delete_review(id).await?;
    info!(review_id = %id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
