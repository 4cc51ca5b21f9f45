//! Caching layer for pedestrian router responses.
//!
//! Coordinates are snapped to a grid (roughly a metre at the default
//! precision) so that repeated requests between the same stops hit the
//! cache even when the stored coordinates differ in the last few digits.
//! Only successful responses are cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::Point;

use super::{PedestrianRouter, WalkPath, WalkRouteError};

/// Cache key: snapped (from.lat, from.lng, to.lat, to.lng).
type PathKey = (i64, i64, i64, i64);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct RouteCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Decimal places kept when snapping coordinates.
    pub precision: u8,
}

impl Default for RouteCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(6 * 60 * 60),
            max_capacity: 10_000,
            precision: 5,
        }
    }
}

/// Pedestrian router with caching.
///
/// Wraps any [`PedestrianRouter`] and caches its successful responses.
pub struct CachedRouter<R> {
    router: R,
    paths: MokaCache<PathKey, Arc<WalkPath>>,
    scale: f64,
}

impl<R: PedestrianRouter> CachedRouter<R> {
    /// Create a new cached router.
    pub fn new(router: R, config: &RouteCacheConfig) -> Self {
        let paths = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            router,
            paths,
            scale: 10f64.powi(i32::from(config.precision.min(9))),
        }
    }

    fn snap(&self, value: f64) -> i64 {
        (value * self.scale).round() as i64
    }

    fn key(&self, from: Point, to: Point) -> PathKey {
        (
            self.snap(from.lat),
            self.snap(from.lng),
            self.snap(to.lat),
            self.snap(to.lng),
        )
    }

    /// Access the underlying router for calls that bypass the cache.
    pub fn router(&self) -> &R {
        &self.router
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.paths.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.paths.invalidate_all();
    }
}

impl<R: PedestrianRouter> PedestrianRouter for CachedRouter<R> {
    async fn route(&self, from: Point, to: Point) -> Result<WalkPath, WalkRouteError> {
        let key = self.key(from, to);

        if let Some(cached) = self.paths.get(&key).await {
            return Ok((*cached).clone());
        }

        let path = self.router.route(from, to).await?;
        self.paths.insert(key, Arc::new(path.clone())).await;
        Ok(path)
    }
}
