/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod events;
pub mod extract;
pub mod health;
pub mod places;
pub mod volunteers;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use axum::Router;
use uuid::Uuid;

/// Build API routes. Place lookups are only mounted when configured.
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    let router = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(events::routes())
        .merge(volunteers::routes())
        .merge(admin::routes());

    if ctx.places.is_some() {
        router.merge(places::routes())
    } else {
        router
    }
}

/// Parse a path or body event id; bad input is the caller's fault
pub(crate) fn parse_event_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid event id".to_string()))
}
