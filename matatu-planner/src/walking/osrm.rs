//! OSRM-compatible pedestrian router client.
//!
//! Queries `/route/v1/{profile}/{lng},{lat};{lng},{lat}` and converts the
//! GeoJSON geometry (which is `[lng, lat]` ordered) into [`Point`]s.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::Point;

use super::error::WalkRouteError;
use super::{PedestrianRouter, WalkPath};

/// Default base URL for a local router.
const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default routing profile.
const DEFAULT_PROFILE: &str = "foot";

/// Configuration for the OSRM client.
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL of the router
    pub base_url: String,
    /// Routing profile (e.g. "foot")
    pub profile: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OsrmConfig {
    /// Create a config for the router at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout_secs: 5,
        }
    }

    /// Set the routing profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteItem>,
}

#[derive(Debug, Deserialize)]
struct RouteItem {
    /// Seconds
    duration: f64,
    /// Metres
    distance: f64,
    geometry: LineGeometry,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// HTTP client for an OSRM-compatible router.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OsrmConfig) -> Result<Self, WalkRouteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile,
        })
    }

    fn route_url(&self, from: Point, to: Point) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}",
            self.base_url, self.profile, from.lng, from.lat, to.lng, to.lat
        )
    }
}

impl PedestrianRouter for OsrmClient {
    async fn route(&self, from: Point, to: Point) -> Result<WalkPath, WalkRouteError> {
        let response = self
            .http
            .get(self.route_url(from, to))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WalkRouteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_route(&body)
    }
}

/// Convert a router response body into a walking path.
fn parse_route(body: &str) -> Result<WalkPath, WalkRouteError> {
    let response: RouteResponse =
        serde_json::from_str(body).map_err(|e| WalkRouteError::Api {
            status: 200,
            message: format!("unparseable router response: {e}"),
        })?;

    if response.code != "Ok" {
        return Err(WalkRouteError::NoRoute(
            response.message.unwrap_or(response.code),
        ));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| WalkRouteError::NoRoute("empty route list".into()))?;

    let geometry = route
        .geometry
        .coordinates
        .into_iter()
        .map(Point::from_lng_lat)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| WalkRouteError::InvalidGeometry)?;

    if !route.duration.is_finite() || route.duration < 0.0 || !route.distance.is_finite() {
        return Err(WalkRouteError::InvalidGeometry);
    }

    Ok(WalkPath {
        minutes: route.duration / 60.0,
        distance_m: route.distance.max(0.0),
        geometry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geojson_in_lng_lat_order() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "duration": 300.0,
                "distance": 410.5,
                "geometry": {"type": "LineString", "coordinates": [[36.8250, -1.2864], [36.8260, -1.2850]]}
            }]
        }"#;
        let path = parse_route(body).unwrap();
        assert_eq!(path.minutes, 5.0);
        assert_eq!(path.distance_m, 410.5);
        assert_eq!(path.geometry[0].lat, -1.2864);
        assert_eq!(path.geometry[0].lng, 36.8250);
    }

    #[test]
    fn no_route_code() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route", "routes": []}"#;
        let result = parse_route(body);
        assert!(matches!(result, Err(WalkRouteError::NoRoute(m)) if m == "Impossible route"));
    }

    #[test]
    fn invalid_coordinates_rejected() {
        let body = r#"{
            "code": "Ok",
            "routes": [{"duration": 1.0, "distance": 1.0, "geometry": {"coordinates": [[-1.28, 136.8]]}}]
        }"#;
        assert!(matches!(
            parse_route(body),
            Err(WalkRouteError::InvalidGeometry)
        ));
    }

    #[test]
    fn url_uses_lng_lat() {
        let client = OsrmClient::new(OsrmConfig::new("http://router/")).unwrap();
        let a = Point::new(-1.2864, 36.825).unwrap();
        let b = Point::new(-1.2850, 36.826).unwrap();
        assert_eq!(
            client.route_url(a, b),
            "http://router/route/v1/foot/36.825000,-1.286400;36.826000,-1.285000"
        );
    }

    #[test]
    fn config_builder() {
        let config = OsrmConfig::new("http://x")
            .with_profile("walking")
            .with_timeout(2);
        assert_eq!(config.profile, "walking");
        assert_eq!(config.timeout_secs, 2);
    }
}
