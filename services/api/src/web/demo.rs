//! services/api/src/web/demo.rs
//!
//! Demo class scheduling: admin-managed slots and public booking requests.

use academy_core::domain::{DemoBooking, DemoSlot, NewDemoBooking, NewDemoSlot};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::params::{
    json_body, non_blank, parse_bool, parse_calendar_day, FieldErrors, ValidPath, ValidQuery,
};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateSlotRequest {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DemoSlotResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub is_booked: bool,
}

impl From<DemoSlot> for DemoSlotResponse {
    fn from(s: DemoSlot) -> Self {
        Self {
            id: s.id,
            date: s.date,
            time: s.time,
            is_booked: s.is_booked,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct SlotFilter {
    /// `true` lists only unbooked slots.
    pub available: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDemoRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub education: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DemoBookingResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course: Option<String>,
    pub education: Option<String>,
    pub date: NaiveDate,
    pub time_slot: String,
    pub created_at: DateTime<Utc>,
}

impl From<DemoBooking> for DemoBookingResponse {
    fn from(b: DemoBooking) -> Self {
        Self {
            id: b.id,
            name: b.name,
            email: b.email,
            phone: b.phone,
            course: b.course,
            education: b.education,
            date: b.date,
            time_slot: b.time_slot,
            created_at: b.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDemoResponse {
    pub booking: DemoBookingResponse,
    /// Whether a matching published slot was reserved for this booking.
    pub slot_reserved: bool,
}

fn confirmation_email_html(booking: &DemoBooking, student_app_url: &str) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>Thank you for booking a free demo class with us.</p>\
         <ul><li>Date: {date}</li><li>Time: {time}</li><li>Course: {course}</li></ul>\
         <p>Our team will contact you on {phone} before the session.</p>\
         <p>Meanwhile, explore the <a href=\"{portal}\">student portal</a>.</p>",
        name = encode_text(&booking.name),
        date = booking.date.format("%d %b %Y"),
        time = encode_text(&booking.time_slot),
        course = encode_text(booking.course.as_deref().unwrap_or("To be discussed")),
        phone = encode_text(&booking.phone),
        portal = encode_double_quoted_attribute(student_app_url),
    )
}

//=========================================================================================
// Slot Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/demo/slots",
    params(SlotFilter),
    responses((status = 200, description = "Slots by date then time", body = [DemoSlotResponse]))
)]
pub async fn list_slots_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(filter): ValidQuery<SlotFilter>,
) -> ApiResult<Json<Vec<DemoSlotResponse>>> {
    let available_only = filter
        .available
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(false);
    let slots = state.db.list_demo_slots(available_only).await?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/demo/slots",
    request_body = CreateSlotRequest,
    responses(
        (status = 201, description = "Slot created", body = DemoSlotResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "A slot already exists for this date and time")
    )
)]
pub async fn create_slot_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let date = non_blank(req.date).and_then(|d| parse_calendar_day(&d));
    let time = non_blank(req.time);

    let mut errors = FieldErrors::new();
    errors.check("date", &date);
    errors.check("time", &time);
    let (Some(date), Some(time)) = (date, time) else {
        return Err(errors.into_error());
    };

    let slot = state.db.create_demo_slot(NewDemoSlot { date, time }).await?;
    info!(slot_id = %slot.id, date = %slot.date, time = %slot.time, "Demo slot created");
    Ok((StatusCode::CREATED, Json(DemoSlotResponse::from(slot))))
}

#[utoipa::path(
    delete,
    path = "/api/demo/slots/{id}",
    params(("id" = Uuid, Path, description = "Slot id")),
    responses(
        (status = 204, description = "Slot deleted"),
        (status = 404, description = "No such slot")
    )
)]
pub async fn delete_slot_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_demo_slot(id).await?;
    info!(slot_id = %id, "Demo slot deleted");
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Booking Handlers
//=========================================================================================

/// Book a demo class. Reserves the matching slot in the same step.
#[utoipa::path(
    post,
    path = "/api/demo/book",
    request_body = BookDemoRequest,
    responses(
        (status = 201, description = "Booking recorded", body = BookDemoResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "The requested slot is already booked")
    )
)]
pub async fn book_demo_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BookDemoRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let name = non_blank(req.name);
    let email = non_blank(req.email).filter(|e| e.contains('@'));
    let phone = non_blank(req.phone);
    let date = non_blank(req.date).and_then(|d| parse_calendar_day(&d));
    let time_slot = non_blank(req.time_slot);

    let mut errors = FieldErrors::new();
    errors.check("name", &name);
    errors.check("email", &email);
    errors.check("phone", &phone);
    errors.check("date", &date);
    errors.check("timeSlot", &time_slot);
    let (Some(name), Some(email), Some(phone), Some(date), Some(time_slot)) =
        (name, email, phone, date, time_slot)
    else {
        return Err(errors.into_error());
    };

    let outcome = state
        .db
        .book_demo(NewDemoBooking {
            name,
            email,
            phone,
            course: non_blank(req.course),
            education: non_blank(req.education),
            date,
            time_slot,
        })
        .await?;
    let booking = outcome.booking;
    info!(
        booking_id = %booking.id,
        slot_id = ?outcome.reserved_slot,
        "Demo booking recorded"
    );

    let html = confirmation_email_html(&booking, &state.config.student_app_url);
    if let Err(e) = state
        .mailer
        .send_email(&booking.email, "Your demo class is booked", &html)
        .await
    {
        warn!(booking_id = %booking.id, error = %e, "Failed to send booking confirmation");
    }

    Ok((
        StatusCode::CREATED,
        Json(BookDemoResponse {
            booking: booking.into(),
            slot_reserved: outcome.reserved_slot.is_some(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/demo/bookings",
    responses((status = 200, description = "Bookings, newest first", body = [DemoBookingResponse]))
)]
pub async fn list_bookings_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DemoBookingResponse>>> {
    let bookings = state.db.list_demo_bookings().await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}
