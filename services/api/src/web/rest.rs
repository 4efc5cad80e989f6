//! services/api/src/web/rest.rs
//!
//! Assembles the REST router from the per-portal handler modules and holds the
//! master definition for the OpenAPI specification.

use crate::web::{
    demo, jobs, meetings, middleware::require_admin, middleware::ADMIN_KEY_HEADER, people,
    reviews, state::AppState, typing, voice,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware as axum_middleware,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Largest accepted request body; review photos are the biggest payloads.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        meetings::create_meeting_handler,
        meetings::list_meetings_handler,
        meetings::get_meeting_handler,
        meetings::delete_meeting_handler,
        meetings::trainer_meetings_handler,
        meetings::trainer_notifications_handler,
        meetings::mark_notification_read_handler,
        people::list_trainers_handler,
        people::create_trainer_handler,
        people::update_trainer_status_handler,
        people::list_students_handler,
        people::create_student_handler,
        people::get_student_handler,
        reviews::list_reviews_handler,
        reviews::create_review_handler,
        reviews::update_review_handler,
        reviews::delete_review_handler,
        typing::submit_typing_handler,
        typing::typing_sessions_handler,
        typing::last_typing_handler,
        typing::list_lessons_handler,
        typing::get_lesson_handler,
        typing::create_lesson_handler,
        typing::legacy_save_handler,
        typing::legacy_history_handler,
        typing::legacy_analytics_handler,
        demo::list_slots_handler,
        demo::create_slot_handler,
        demo::delete_slot_handler,
        demo::book_demo_handler,
        demo::list_bookings_handler,
        voice::start_interview_handler,
        voice::vapi_webhook_handler,
        voice::interview_history_handler,
        jobs::list_jobs_handler,
        jobs::get_job_handler,
        jobs::create_job_handler,
        jobs::update_job_handler,
        jobs::delete_job_handler,
    ),
    components(
        schemas(
            HealthResponse,
            meetings::CreateMeetingRequest, meetings::MeetingResponse, meetings::NotificationResponse,
            people::TrainerResponse, people::CreateTrainerRequest, people::UpdateTrainerStatusRequest,
            people::StudentResponse, people::CreateStudentRequest,
            reviews::ReviewResponse, reviews::ReviewForm,
            typing::SubmitTypingRequest, typing::TypingHistoryResponse, typing::TypingSummaryResponse,
            typing::TypingSessionsResponse, typing::CreateLessonRequest, typing::TypingLessonResponse,
            typing::LegacySaveRequest, typing::TypingProgressResponse, typing::TypingAnalyticsResponse,
            demo::CreateSlotRequest, demo::DemoSlotResponse, demo::BookDemoRequest,
            demo::DemoBookingResponse, demo::BookDemoResponse,
            voice::StartInterviewRequest, voice::StartInterviewResponse, voice::CallMetadata,
            voice::WebhookEnvelope, voice::WebhookAck, voice::InterviewResponse,
            jobs::JobResponse, jobs::JobRequest,
        )
    ),
    tags(
        (name = "Career Academy API", description = "Admin, trainer and student portal endpoints.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is running", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

//=========================================================================================
// Router
//=========================================================================================

fn cors_layer(state: &AppState) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(ADMIN_KEY_HEADER),
        ])
}

/// Builds the complete application: API routes, Swagger UI and the shared layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let admin = || axum_middleware::from_fn_with_state(state.clone(), require_admin);

    let admin_routes = Router::new()
        .route(
            "/api/admin/meetings",
            get(meetings::list_meetings_handler).post(meetings::create_meeting_handler),
        )
        .route(
            "/api/admin/meetings/{id}",
            get(meetings::get_meeting_handler).delete(meetings::delete_meeting_handler),
        )
        .route(
            "/api/admin/trainers",
            get(people::list_trainers_handler).post(people::create_trainer_handler),
        )
        .route(
            "/api/admin/trainers/{id}/status",
            patch(people::update_trainer_status_handler),
        )
        .route(
            "/api/admin/students",
            get(people::list_students_handler).post(people::create_student_handler),
        )
        .route("/api/admin/students/{id}", get(people::get_student_handler))
        .route("/api/admin/jobs", post(jobs::create_job_handler))
        .route(
            "/api/admin/jobs/{id}",
            put(jobs::update_job_handler).delete(jobs::delete_job_handler),
        )
        .route("/api/demo/bookings", get(demo::list_bookings_handler))
        .route_layer(admin());

    // Paths where reads are public and mutations need the admin key.
    let mixed_routes = Router::new()
        .route(
            "/api/reviews",
            get(reviews::list_reviews_handler)
                .merge(post(reviews::create_review_handler).route_layer(admin())),
        )
        .route(
            "/api/reviews/{id}",
            put(reviews::update_review_handler)
                .delete(reviews::delete_review_handler)
                .route_layer(admin()),
        )
        .route(
            "/api/demo/slots",
            get(demo::list_slots_handler)
                .merge(post(demo::create_slot_handler).route_layer(admin())),
        )
        .route(
            "/api/demo/slots/{id}",
            delete(demo::delete_slot_handler).route_layer(admin()),
        )
        .route(
            "/api/typing/lessons",
            get(typing::list_lessons_handler)
                .merge(post(typing::create_lesson_handler).route_layer(admin())),
        );

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/trainer/{trainer_id}/meetings",
            get(meetings::trainer_meetings_handler),
        )
        .route(
            "/api/trainer/{trainer_id}/notifications",
            get(meetings::trainer_notifications_handler),
        )
        .route(
            "/api/trainer/notifications/{id}/read",
            patch(meetings::mark_notification_read_handler),
        )
        .route("/api/typing/submit", post(typing::submit_typing_handler))
        .route(
            "/api/typing/sessions/{student_id}",
            get(typing::typing_sessions_handler),
        )
        .route("/api/typing/last/{student_id}", get(typing::last_typing_handler))
        .route("/api/typing/lessons/{id}", get(typing::get_lesson_handler))
        .route("/api/typing/save", post(typing::legacy_save_handler))
        .route(
            "/api/typing/history/{student_id}",
            get(typing::legacy_history_handler),
        )
        .route("/api/typing/analytics", get(typing::legacy_analytics_handler))
        .route("/api/demo/book", post(demo::book_demo_handler))
        .route(
            "/api/voice/start-interview",
            post(voice::start_interview_handler),
        )
        .route("/api/voice/vapi-webhook", post(voice::vapi_webhook_handler))
        .route(
            "/api/voice/history/{student_id}",
            get(voice::interview_history_handler),
        )
        .route("/api/jobs", get(jobs::list_jobs_handler))
        .route("/api/jobs/{id}", get(jobs::get_job_handler));

    let cors = cors_layer(&state);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(mixed_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
