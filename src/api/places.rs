/// Nearby place lookup endpoint
///
/// Mounted only when a places API key is configured.
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
    places::Place,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<u32>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
}

/// Build place lookup routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/places/nearby", get(nearby))
}

/// Suggest venues near a coordinate
async fn nearby(
    State(ctx): State<AppContext>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<Vec<Place>>> {
    let client = ctx
        .places
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Places lookup not configured".to_string()))?;

    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(ApiError::Validation("Invalid coordinates".to_string()));
    }

    let radius = query.radius.unwrap_or(5000).min(50_000);
    let place_type = query.place_type.as_deref().unwrap_or("establishment");

    let places = client.nearby(query.lat, query.lng, radius, place_type).await?;
    Ok(Json(places))
}
