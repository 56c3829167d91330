/// Admin moderation endpoints
///
/// Every route here requires an authenticated admin.
use crate::{
    api::parse_event_id,
    auth::AdminAuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
    events::Event,
    moderation::{ApprovalAuditEntry, ModerationStats},
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDecisionRequest {
    pub ids: Vec<String>,
    pub reason: Option<String>,
}

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/events/pending", get(pending_events))
        .route("/admin/events/bulk-approve", post(bulk_approve))
        .route("/admin/events/bulk-reject", post(bulk_reject))
        .route("/admin/events/:id/approve", post(approve_event))
        .route("/admin/events/:id/reject", post(reject_event))
        .route("/admin/audit/:event_id", get(audit_trail))
        .route("/admin/stats", get(moderation_stats))
}

/// The review queue, oldest submission first
async fn pending_events(
    State(ctx): State<AppContext>,
    _admin: AdminAuthContext,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(ctx.moderation.list_pending().await?))
}

/// Approve one pending event
async fn approve_event(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<Event>> {
    let id = parse_event_id(&id)?;
    let reason = body.and_then(|Json(req)| req.reason);

    let event = ctx
        .moderation
        .approve(id, admin.admin.id, reason.as_deref())
        .await?;

    Ok(Json(event))
}

/// Reject one pending event
async fn reject_event(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<Event>> {
    let id = parse_event_id(&id)?;
    let reason = body.and_then(|Json(req)| req.reason);

    let event = ctx
        .moderation
        .reject(id, admin.admin.id, reason.as_deref())
        .await?;

    Ok(Json(event))
}

/// Approve a batch of events
async fn bulk_approve(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Json(req): Json<BulkDecisionRequest>,
) -> ApiResult<Json<Vec<Event>>> {
    let ids = parse_id_list(&req.ids)?;
    let events = ctx
        .moderation
        .bulk_approve(&ids, admin.admin.id, req.reason.as_deref())
        .await?;

    Ok(Json(events))
}

/// Reject a batch of events
async fn bulk_reject(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Json(req): Json<BulkDecisionRequest>,
) -> ApiResult<Json<Vec<Event>>> {
    let ids = parse_id_list(&req.ids)?;
    let events = ctx
        .moderation
        .bulk_reject(&ids, admin.admin.id, req.reason.as_deref())
        .await?;

    Ok(Json(events))
}

/// Full decision history for one event
async fn audit_trail(
    State(ctx): State<AppContext>,
    _admin: AdminAuthContext,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Vec<ApprovalAuditEntry>>> {
    let event_id = parse_event_id(&event_id)?;
    Ok(Json(ctx.moderation.audit_trail(event_id).await?))
}

/// Decision counts by day and by admin
async fn moderation_stats(
    State(ctx): State<AppContext>,
    _admin: AdminAuthContext,
) -> ApiResult<Json<ModerationStats>> {
    Ok(Json(ctx.moderation.stats().await?))
}

fn parse_id_list(raw: &[String]) -> ApiResult<Vec<Uuid>> {
    if raw.is_empty() {
        return Err(ApiError::Validation("No event ids provided".to_string()));
    }

    raw.iter().map(|id| parse_event_id(id)).collect()
}
