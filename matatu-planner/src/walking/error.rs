//! Pedestrian router error types.

/// Errors from a pedestrian-routing service.
///
/// The planner never surfaces these to callers: every failure falls back to
/// a straight-line estimate.
#[derive(Debug, thiserror::Error)]
pub enum WalkRouteError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Router returned an error status code
    #[error("router error {status}: {message}")]
    Api { status: u16, message: String },

    /// Router answered but found no walkable path
    #[error("no walking route: {0}")]
    NoRoute(String),

    /// Router returned a geometry with invalid coordinates
    #[error("invalid route geometry")]
    InvalidGeometry,

    /// Call did not finish within the configured timeout
    #[error("pedestrian router timed out")]
    Timeout,

    /// No router is configured
    #[error("pedestrian router unavailable")]
    Unavailable,
}
