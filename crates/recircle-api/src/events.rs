use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use recircle_db::models::{EnrollmentRow, ParticipationRow};
use recircle_types::api::{
    Claims, CoinBalance, EnrollResponse, EnrollmentResponse, EventListResponse,
    EventPaymentRequest, EventResponse, ParticipateEventRequest, ParticipationListResponse,
    ParticipationResponse, RecordParticipationResponse,
};

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const HISTORY_LIMIT: u32 = 20;

fn participation(row: ParticipationRow) -> ParticipationResponse {
    ParticipationResponse {
        id: convert::uuid(&row.id, "participation id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        event_id: row.event_id,
        event_name: row.event_name,
        coins_earned: row.coins_earned,
    }
}

fn enrollment(row: EnrollmentRow) -> EnrollmentResponse {
    EnrollmentResponse {
        id: convert::uuid(&row.id, "enrollment id"),
        user_id: convert::uuid(&row.user_id, "user id"),
        event_id: row.event_id,
        paid: row.paid,
    }
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.list_events()).await?;
    Ok(Json(EventListResponse {
        events: rows
            .into_iter()
            .map(|e| EventResponse {
                id: e.id,
                title: e.title,
                description: e.description,
                location: e.location,
                starts_at: e.starts_at,
                fee: e.fee,
            })
            .collect(),
    }))
}

pub async fn participate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<ParticipateEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(event_id), Some(event_name)) = (non_empty(req.event_id), non_empty(req.event_name))
    else {
        return Err(ApiError::bad_request("Event ID and name are required"));
    };
    let event_type = non_empty(req.event_type);

    let uid = claims.sub.to_string();
    let (row, eco_coins) = blocking(&state, move |db| {
        db.record_event_participation(&uid, &event_id, &event_name, event_type.as_deref())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordParticipationResponse {
            message: "Event participation recorded successfully!".into(),
            participation: participation(row),
            user_stats: CoinBalance { eco_coins },
        }),
    ))
}

pub async fn participations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.get_event_participations(&uid, HISTORY_LIMIT)).await?;
    Ok(Json(ParticipationListResponse {
        participations: rows.into_iter().map(participation).collect(),
    }))
}

pub async fn enroll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| db.enroll_in_event(&event_id, &uid)).await?;

    Ok(Json(EnrollResponse {
        message: "Enrolled".into(),
        enrollment: enrollment(row),
    }))
}

/// Mark an enrollment paid after a client-side payment. The confirmation
/// email is only logged.
pub async fn payment(
    State(state): State<AppState>,
    body: Result<Json<EventPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(event_id), Some(user_id), Some(email)) =
        (non_empty(req.event_id), req.user_id, non_empty(req.email))
    else {
        return Err(ApiError::bad_request("eventId, userId, email required"));
    };

    let (row, event) = blocking(&state, move |db| {
        let row = db.mark_enrollment_paid(&event_id, &user_id.to_string())?;
        let event = db.get_event(&event_id)?;
        Ok((row, event))
    })
    .await?;

    if let Some(event) = event {
        info!(
            "Enrollment confirmed for {} <{}>: {} at {} ({})",
            user_id, email, event.title, event.location, event.starts_at
        );
    }

    Ok(Json(EnrollResponse {
        message: "Payment processed".into(),
        enrollment: enrollment(row),
    }))
}
