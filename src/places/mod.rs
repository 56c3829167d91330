/// Nearby place lookup backed by the Google Places API
///
/// Results are cached per query for a short window so repeated map
/// pans do not hammer the upstream quota.
use crate::cache::TtlCache;
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PLACES_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// A place suggestion returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    status: String,
    #[serde(default)]
    results: Vec<UpstreamPlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamPlace {
    name: String,
    vicinity: Option<String>,
    geometry: UpstreamGeometry,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpstreamGeometry {
    location: UpstreamLocation,
}

#[derive(Debug, Deserialize)]
struct UpstreamLocation {
    lat: f64,
    lng: f64,
}

/// Google Places client with per-query caching
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: String,
    cache: TtlCache<Vec<Place>>,
}

impl PlacesClient {
    pub fn new(api_key: String, cache_ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Look up places near a coordinate, serving from cache when a
    /// matching query was made within the TTL
    pub async fn nearby(
        &self,
        lat: f64,
        lng: f64,
        radius: u32,
        place_type: &str,
    ) -> ApiResult<Vec<Place>> {
        let key = format!("{}|{}|{}|{}", lat, lng, radius, place_type);
        self.cache
            .get_or_load(&key, || self.fetch_nearby(lat, lng, radius, place_type))
            .await
    }

    async fn fetch_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius: u32,
        place_type: &str,
    ) -> ApiResult<Vec<Place>> {
        let response = self
            .http
            .get(PLACES_ENDPOINT)
            .query(&[
                ("location", format!("{},{}", lat, lng)),
                ("radius", radius.to_string()),
                ("type", place_type.to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Places request failed: {}", e)))?;

        let body: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Internal(format!("Invalid places response: {}", e)))?;

        // ZERO_RESULTS is a successful empty answer, not a failure
        if body.status != "OK" && body.status != "ZERO_RESULTS" {
            tracing::warn!(
                "places lookup returned status {}: {}",
                body.status,
                body.error_message.as_deref().unwrap_or("no detail")
            );
            return Err(ApiError::Internal(format!(
                "Places lookup failed: {}",
                body.status
            )));
        }

        Ok(body
            .results
            .into_iter()
            .map(|p| Place {
                name: p.name,
                address: p.vicinity,
                lat: p.geometry.location.lat,
                lng: p.geometry.location.lng,
                rating: p.rating,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_response_parses() {
        let raw = r#"{
            "status": "OK",
            "results": [
                {
                    "name": "Town Hall",
                    "vicinity": "1 Main St",
                    "geometry": {"location": {"lat": 40.1, "lng": -75.2}},
                    "rating": 4.5
                },
                {
                    "name": "Riverside Park",
                    "geometry": {"location": {"lat": 40.2, "lng": -75.3}}
                }
            ]
        }"#;

        let parsed: UpstreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].rating, Some(4.5));
        assert!(parsed.results[1].vicinity.is_none());
    }

    #[test]
    fn zero_results_parses_to_empty() {
        let raw = r#"{"status": "ZERO_RESULTS", "results": []}"#;
        let parsed: UpstreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "ZERO_RESULTS");
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn error_status_carries_detail() {
        let raw = r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#;
        let parsed: UpstreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "REQUEST_DENIED");
        assert_eq!(parsed.error_message.as_deref(), Some("bad key"));
    }
}
