/// Health and metrics endpoints
use crate::{context::AppContext, error::ApiResult, metrics};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};

/// Build health routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(render_metrics))
}

/// Basic liveness check
async fn health(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.service.version,
    }))
}

/// Readiness check: the database must answer a query
async fn readiness(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!("readiness check failed: {}", e);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": ctx.config.service.version,
    })))
}

async fn check_database(ctx: &AppContext) -> ApiResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

/// Prometheus text exposition
async fn render_metrics() -> String {
    metrics::render_metrics()
}
