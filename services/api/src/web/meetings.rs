//! services/api/src/web/meetings.rs
//!
//! Admin meeting scheduling with trainer notification fan-out, plus the trainer
//! portal views of meetings and notifications.

use academy_core::domain::{Attendees, Meeting, NewMeeting, NewNotification, Notification, Trainer};
use academy_core::ports::PortResult;
use academy_core::TrainerStatus;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::params::{json_body, non_blank, parse_calendar_day, FieldErrors, ValidPath};
use crate::web::state::AppState;

/// Upper bound on recipients notified at the same time.
const FANOUT_CONCURRENCY: usize = 8;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: Option<String>,
    pub time: Option<String>,
    pub link: Option<String>,
    /// Trainer ids, or `["ALL"]`. Omitted or empty means every active trainer.
    pub attendees: Option<Vec<String>>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub link: String,
    /// `["ALL"]` or the addressed trainer ids.
    pub attendees: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Meeting> for MeetingResponse {
    fn from(meeting: Meeting) -> Self {
        let attendees = match meeting.attendees {
            Attendees::All => vec![Attendees::ALL_SENTINEL.to_string()],
            Attendees::Trainers(ids) => ids.iter().map(Uuid::to_string).collect(),
        };
        Self {
            id: meeting.id,
            title: meeting.title,
            description: meeting.description,
            date: meeting.date,
            time: meeting.time,
            link: meeting.link,
            attendees,
            created_at: meeting.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub meeting_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            trainer_id: n.trainer_id,
            meeting_id: n.meeting_id,
            title: n.title,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// Reads the attendee list; `None` marks it invalid.
fn parse_attendees(raw: Option<Vec<String>>) -> Option<Attendees> {
    let raw = raw.unwrap_or_default();
    if raw
        .iter()
        .any(|a| a.trim().eq_ignore_ascii_case(Attendees::ALL_SENTINEL))
    {
        return Some(Attendees::All);
    }
    raw.iter()
        .map(|a| Uuid::parse_str(a.trim()).ok())
        .collect::<Option<Vec<_>>>()
        .map(Attendees::from_ids)
}

//=========================================================================================
// Notification fan-out
//=========================================================================================

async fn resolve_recipients(state: &AppState, attendees: &Attendees) -> PortResult<Vec<Trainer>> {
    match attendees {
        Attendees::All => state.db.list_trainers(Some(TrainerStatus::Active)).await,
        Attendees::Trainers(ids) => {
            let trainers = state.db.get_trainers_by_ids(ids).await?;
            for id in ids.iter().filter(|id| !trainers.iter().any(|t| t.id == **id)) {
                warn!(trainer_id = %id, "Meeting addressed to unknown trainer; skipping");
            }
            Ok(trainers)
        }
    }
}

fn meeting_email_html(meeting: &Meeting, trainer: &Trainer) -> String {
    format!(
        "<p>Hello {name},</p>\
         <p>A new meeting has been scheduled: <strong>{title}</strong></p>\
         <ul><li>Date: {date}</li><li>Time: {time}</li><li>Link: <a href=\"{href}\">{link}</a></li></ul>\
         <p>{description}</p>",
        name = encode_text(&trainer.name),
        title = encode_text(&meeting.title),
        date = meeting.date.format("%d %b %Y"),
        time = encode_text(&meeting.time),
        href = encode_double_quoted_attribute(&meeting.link),
        link = encode_text(&meeting.link),
        description = encode_text(meeting.description.as_deref().unwrap_or_default()),
    )
}

/// Creates an in-store notification and sends an email. Failures are logged only.
async fn notify_trainer(state: &AppState, meeting: &Meeting, trainer: &Trainer) {
    let notification = NewNotification {
        trainer_id: trainer.id,
        meeting_id: Some(meeting.id),
        title: format!("New meeting: {}", meeting.title),
        message: format!(
            "{} is scheduled on {} at {}.",
            meeting.title, meeting.date, meeting.time
        ),
    };
    if let Err(e) = state.db.create_notification(notification).await {
        warn!(trainer_id = %trainer.id, error = %e, "Failed to store meeting notification");
    }

    let subject = format!("New meeting scheduled: {}", meeting.title);
    let html = meeting_email_html(meeting, trainer);
    if let Err(e) = state.mailer.send_email(&trainer.email, &subject, &html).await {
        warn!(trainer_id = %trainer.id, error = %e, "Failed to email meeting notification");
    }
}

async fn fan_out(state: &AppState, meeting: &Meeting) {
    let recipients = match resolve_recipients(state, &meeting.attendees).await {
        Ok(recipients) => recipients,
        Err(e) => {
            warn!(meeting_id = %meeting.id, error = %e, "Could not resolve meeting recipients");
            return;
        }
    };
    let count = recipients.len();

    stream::iter(recipients)
        .for_each_concurrent(FANOUT_CONCURRENCY, |trainer| async move {
            notify_trainer(state, meeting, &trainer).await;
        })
        .await;

    info!(meeting_id = %meeting.id, recipients = count, "Meeting notifications dispatched");
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

/// Schedule a meeting and notify its attendees.
#[utoipa::path(
    post,
    path = "/api/admin/meetings",
    request_body = CreateMeetingRequest,
    responses(
        (status = 201, description = "Meeting created", body = MeetingResponse),
        (status = 400, description = "Missing or invalid fields")
    )
)]
pub async fn create_meeting_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateMeetingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;

    let title = non_blank(req.title);
    let date = non_blank(req.date).and_then(|d| parse_calendar_day(&d));
    let time = non_blank(req.time);
    let link = non_blank(req.link);
    let attendees = parse_attendees(req.attendees);

    let mut errors = FieldErrors::new();
    errors.check("title", &title);
    errors.check("date", &date);
    errors.check("time", &time);
    errors.check("link", &link);
    errors.check("attendees", &attendees);
    let (Some(title), Some(date), Some(time), Some(link), Some(attendees)) =
        (title, date, time, link, attendees)
    else {
        return Err(errors.into_error());
    };

    let meeting = state
        .db
        .create_meeting(NewMeeting {
            title,
            description: non_blank(req.description),
            date,
            time,
            link,
            attendees,
        })
        .await?;
    info!(meeting_id = %meeting.id, "Meeting created");

    fan_out(&state, &meeting).await;

    Ok((StatusCode::CREATED, Json(MeetingResponse::from(meeting))))
}

/// List all meetings, latest first.
#[utoipa::path(
    get,
    path = "/api/admin/meetings",
    responses((status = 200, description = "All meetings", body = [MeetingResponse]))
)]
pub async fn list_meetings_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<MeetingResponse>>> {
    let meetings = state.db.list_meetings().await?;
    Ok(Json(meetings.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/meetings/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    responses(
        (status = 200, description = "The meeting", body = MeetingResponse),
        (status = 404, description = "No such meeting")
    )
)]
pub async fn get_meeting_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<MeetingResponse>> {
    Ok(Json(state.db.get_meeting(id).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/meetings/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    responses(
        (status = 204, description = "Meeting deleted"),
        (status = 404, description = "No such meeting")
    )
)]
pub async fn delete_meeting_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_meeting(id).await?;
    info!(meeting_id = %id, "Meeting deleted");
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Trainer Portal Handlers
//=========================================================================================

/// Meetings addressed to a trainer, either by id or to everyone.
#[utoipa::path(
    get,
    path = "/api/trainer/{trainer_id}/meetings",
    params(("trainer_id" = Uuid, Path, description = "Trainer id")),
    responses((status = 200, description = "The trainer's meetings", body = [MeetingResponse]))
)]
pub async fn trainer_meetings_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(trainer_id): ValidPath<Uuid>,
) -> ApiResult<Json<Vec<MeetingResponse>>> {
    let meetings = state.db.list_meetings().await?;
    Ok(Json(
        meetings
            .into_iter()
            .filter(|m| m.attendees.includes(trainer_id))
            .map(Into::into)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/trainer/{trainer_id}/notifications",
    params(("trainer_id" = Uuid, Path, description = "Trainer id")),
    responses((status = 200, description = "Newest first", body = [NotificationResponse]))
)]
pub async fn trainer_notifications_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(trainer_id): ValidPath<Uuid>,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let notifications = state.db.list_notifications(trainer_id).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/trainer/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 404, description = "No such notification")
    )
)]
pub async fn mark_notification_read_handler(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<NotificationResponse>> {
    Ok(Json(state.db.mark_notification_read(id).await?.into()))
}
