/// Event CRUD endpoints
use crate::{
    api::{extract::ValidatedJson, parse_event_id},
    auth::AuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
    events::{Event, EventPatch, NewEvent},
    users::User,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub date: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub volunteer_positions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub volunteer_positions: Option<Vec<String>>,
}

impl UpdateEventRequest {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.volunteer_positions.is_none()
    }
}

fn parse_date(raw: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::Validation("Invalid date format".to_string()))
}

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            patch(update_event).get(get_event).delete(delete_event),
        )
}

/// List all events, soonest first
async fn list_events(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(ctx.events.list().await?))
}

/// Fetch a single event
async fn get_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let id = parse_event_id(&id)?;
    Ok(Json(ctx.events.get(id).await?))
}

/// Submit a new event; it enters the review queue as pending
async fn create_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = ctx
        .events
        .create(
            NewEvent {
                title: req.title,
                date: parse_date(&req.date)?,
                location: req.location,
                description: req.description,
                image: req.image,
                volunteer_positions: req.volunteer_positions,
            },
            Some(auth.user.id),
        )
        .await?;

    tracing::info!("user {} submitted event {}", auth.user.id, event.id);

    Ok((StatusCode::CREATED, Json(event)))
}

/// Update an event; only the submitter or an admin may edit
async fn update_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<Event>> {
    let id = parse_event_id(&id)?;

    if req.is_empty() {
        return Err(ApiError::Validation(
            "At least one field must be provided".to_string(),
        ));
    }

    require_ownership(&ctx, id, &auth.user).await?;

    let positions_changed = req.volunteer_positions.is_some();
    let patch = EventPatch {
        title: req.title,
        date: req.date.as_deref().map(parse_date).transpose()?,
        location: req.location,
        description: req.description,
        image: req.image,
        volunteer_positions: req.volunteer_positions,
    };

    let event = ctx.events.update(id, patch).await?;

    // Sign-ups for positions that no longer exist are dropped
    if positions_changed {
        ctx.volunteers
            .cleanup_removed_positions(id, &event.volunteer_positions)
            .await?;
    }

    Ok(Json(event))
}

/// Delete an event; only the submitter or an admin may remove it
async fn delete_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let id = parse_event_id(&id)?;

    require_ownership(&ctx, id, &auth.user).await?;

    let event = ctx.events.delete(id).await?;
    tracing::info!("user {} deleted event {}", auth.user.id, id);

    Ok(Json(event))
}

async fn require_ownership(ctx: &AppContext, id: uuid::Uuid, user: &User) -> ApiResult<()> {
    // Existence first, so a missing event is 404 rather than 403
    ctx.events.get(id).await?;

    if user.role.is_admin() || ctx.events.is_owned_by(id, user.id).await? {
        return Ok(());
    }

    Err(ApiError::Authorization(
        "Not the owner of this event".to_string(),
    ))
}
