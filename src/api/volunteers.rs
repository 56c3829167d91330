/// Volunteer sign-up endpoints
use crate::{
    api::{extract::ValidatedJson, parse_event_id},
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    volunteers::{EventVolunteers, VolunteerRegistration},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "Event id is required"))]
    pub event_id: String,
    #[validate(length(min = 1, message = "Position is required"))]
    pub position: String,
}

/// Build volunteer routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/volunteers/register", post(register))
        .route("/volunteers/unregister", delete(unregister))
        .route("/volunteers/event/:event_id", get(event_volunteers))
        .route("/volunteers/my-events", get(my_events))
}

/// Sign the caller up for a position on an event
async fn register(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<VolunteerRegistration>)> {
    let event_id = parse_event_id(&req.event_id)?;

    // The event must exist and have the position on offer
    let event = ctx.events.get(event_id).await?;
    if !event.volunteer_positions.contains(&req.position) {
        return Err(crate::error::ApiError::Validation(
            "Position not offered for this event".to_string(),
        ));
    }

    let registration = ctx
        .volunteers
        .register(event_id, auth.user.id, &req.position)
        .await?;

    tracing::info!(
        "user {} signed up for '{}' on event {}",
        auth.user.id,
        req.position,
        event_id
    );

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Withdraw the caller from a position
async fn unregister(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<RegistrationRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let event_id = parse_event_id(&req.event_id)?;

    ctx.volunteers
        .unregister(event_id, auth.user.id, &req.position)
        .await?;

    Ok(Json(serde_json::json!({ "removed": true })))
}

/// Everyone signed up for an event
async fn event_volunteers(
    State(ctx): State<AppContext>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Vec<VolunteerRegistration>>> {
    let event_id = parse_event_id(&event_id)?;
    Ok(Json(ctx.volunteers.for_event(event_id).await?))
}

/// Sign-ups across all events the caller submitted
async fn my_events(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<EventVolunteers>>> {
    Ok(Json(ctx.volunteers.for_owner_events(auth.user.id).await?))
}
