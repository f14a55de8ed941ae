//! Coordinate-to-address resolution for activity locations
//!
//! Best-effort enrichment: every outcome is a displayable `Location`,
//! never an error. Successful lookups are cached by the exact coordinate
//! string for the life of the resolver.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::defaults::{FAILED_TO_LOAD, INVALID_COORDINATES, INVALID_FORMAT, LOCATION_NOT_FOUND, NO_LOCATION};
use crate::error::{CoordinateError, GeocodeError};
use crate::services::geocoding::GeocodeService;
use crate::types::{Coordinates, GeoAddress};

/// What a location cell shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Address(String),
    NoLocation,
    Invalid(CoordinateError),
    NotFound,
    FailedToLoad,
}

impl Location {
    pub fn label(&self) -> &str {
        match self {
            Location::Address(address) => address,
            Location::NoLocation => NO_LOCATION,
            Location::Invalid(CoordinateError::InvalidFormat(_)) => INVALID_FORMAT,
            Location::Invalid(CoordinateError::InvalidNumber(_)) => INVALID_COORDINATES,
            Location::NotFound => LOCATION_NOT_FOUND,
            Location::FailedToLoad => FAILED_TO_LOAD,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a raw `"lat,lng"` string
pub fn parse_coordinates(raw: &str) -> Result<Coordinates, CoordinateError> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [lat, lng] = fields.as_slice() else {
        return Err(CoordinateError::InvalidFormat(raw.to_string()));
    };

    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    match (parse(*lat), parse(*lng)) {
        (Some(lat), Some(lng)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) => {
            Ok(Coordinates { lat, lng })
        }
        _ => Err(CoordinateError::InvalidNumber(raw.to_string())),
    }
}

/// Resolves coordinate strings through a [`GeocodeService`] with a
/// session cache in front of it.
///
/// Request timeouts belong to the service, which starts the clock only
/// once its rate limiter lets the request through.
pub struct GeocodeResolver {
    service: Arc<dyn GeocodeService>,
    cache: RwLock<HashMap<String, GeoAddress>>,
}

impl GeocodeResolver {
    pub fn new(service: Arc<dyn GeocodeService>) -> Self {
        Self {
            service,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached address for an exact coordinate key
    pub fn cached(&self, key: &str) -> Option<GeoAddress> {
        self.cache.read().get(key).cloned()
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    async fn lookup(&self, coords: Coordinates) -> Result<Option<String>, GeocodeError> {
        Ok(self.service.reverse(coords).await?.map(|r| r.label))
    }

    /// Resolve one raw coordinate string to a display location
    pub async fn resolve(&self, raw: &str) -> Location {
        if raw.trim().is_empty() {
            return Location::NoLocation;
        }

        let coords = match parse_coordinates(raw) {
            Ok(coords) => coords,
            Err(e) => {
                debug!(key = raw, "Skipping lookup: {}", e);
                return Location::Invalid(e);
            }
        };

        if let Some(hit) = self.cached(raw) {
            return Location::Address(hit.address);
        }

        match self.lookup(coords).await {
            Ok(Some(address)) => {
                // Concurrent lookups of the same key converge on the same value
                self.cache.write().insert(
                    raw.to_string(),
                    GeoAddress {
                        coordinate_key: raw.to_string(),
                        address: address.clone(),
                        resolved_at: Utc::now(),
                    },
                );
                debug!(key = raw, %address, "Location resolved via {}", self.service.name());
                Location::Address(address)
            }
            Ok(None) => {
                debug!(key = raw, "No address known for coordinates");
                Location::NotFound
            }
            Err(e) => {
                warn!(key = raw, "Reverse geocoding degraded: {}", e);
                Location::FailedToLoad
            }
        }
    }

    /// Resolve many coordinate strings concurrently, one lookup per
    /// distinct key
    pub async fn resolve_all<'a, I>(&self, raws: I) -> HashMap<String, Location>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut keys: Vec<&str> = raws.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let resolved = join_all(keys.iter().map(|key| self.resolve(key))).await;
        keys.into_iter()
            .map(str::to_string)
            .zip(resolved)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::{RateLimiter, ReverseGeocodingResult};
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behaviour {
        Found,
        NotFound,
        Fail,
        /// Answers at once, but only after a rate limiter slot
        Throttled(RateLimiter),
    }

    struct CountingGeocoder {
        calls: AtomicUsize,
        behaviour: Behaviour,
    }

    impl CountingGeocoder {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                behaviour,
            })
        }
    }

    fn label(coords: Coordinates) -> String {
        format!("Road {:.2}, Town {:.2}", coords.lat, coords.lng)
    }

    #[async_trait]
    impl GeocodeService for CountingGeocoder {
        async fn reverse(&self, coords: Coordinates) -> Result<Option<ReverseGeocodingResult>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Found => {
                    // Yield so concurrent callers overlap in flight
                    tokio::task::yield_now().await;
                    Ok(Some(ReverseGeocodingResult {
                        label: label(coords),
                        display_name: String::new(),
                    }))
                }
                Behaviour::NotFound => Ok(None),
                Behaviour::Fail => Err(GeocodeError::Unavailable(anyhow::anyhow!("connection refused"))),
                Behaviour::Throttled(limiter) => {
                    limiter.wait().await;
                    Ok(Some(ReverseGeocodingResult {
                        label: label(coords),
                        display_name: String::new(),
                    }))
                }
            }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn resolver(service: Arc<CountingGeocoder>) -> GeocodeResolver {
        GeocodeResolver::new(service)
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(
            parse_coordinates("6.9271, 79.8612").unwrap(),
            Coordinates { lat: 6.9271, lng: 79.8612 }
        );
        assert!(matches!(parse_coordinates("not,a,coord"), Err(CoordinateError::InvalidFormat(_))));
        assert!(matches!(parse_coordinates("6.9271"), Err(CoordinateError::InvalidFormat(_))));
        assert!(matches!(parse_coordinates("abc,79.8"), Err(CoordinateError::InvalidNumber(_))));
        assert!(matches!(parse_coordinates("NaN,79.8"), Err(CoordinateError::InvalidNumber(_))));
        assert!(matches!(parse_coordinates("inf,79.8"), Err(CoordinateError::InvalidNumber(_))));
        assert!(matches!(parse_coordinates("91.0,79.8"), Err(CoordinateError::InvalidNumber(_))));
    }

    #[tokio::test]
    async fn test_resolve_caches_by_exact_key() {
        let service = CountingGeocoder::new(Behaviour::Found);
        let resolver = resolver(service.clone());

        let first = resolver.resolve("6.9271,79.8612").await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            resolver.cached("6.9271,79.8612").map(|a| a.address),
            Some(first.label().to_string())
        );

        let second = resolver.resolve("6.9271,79.8612").await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_of_same_key_converges() {
        let service = CountingGeocoder::new(Behaviour::Found);
        let resolver = resolver(service.clone());

        let results = join_all((0..5).map(|_| resolver.resolve("6.9271,79.8612"))).await;

        assert!(results.iter().all(|r| *r == results[0]), "results: {:?}", results);
        assert!(matches!(results[0], Location::Address(_)));
        assert_eq!(resolver.cache_len(), 1);
        assert_eq!(
            resolver.cached("6.9271,79.8612").map(|a| a.address),
            Some(results[0].label().to_string())
        );
        let calls = service.calls.load(Ordering::SeqCst);
        assert!((1..=5).contains(&calls));
    }

    #[tokio::test]
    async fn test_resolve_empty_is_no_location_without_lookup() {
        let service = CountingGeocoder::new(Behaviour::Found);
        let resolver = resolver(service.clone());

        assert_eq!(resolver.resolve("").await, Location::NoLocation);
        assert_eq!(resolver.resolve("   ").await.label(), "No location");
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_invalid_is_sentinel_without_lookup() {
        let service = CountingGeocoder::new(Behaviour::Found);
        let resolver = resolver(service.clone());

        assert_eq!(resolver.resolve("not,a,coord").await.label(), "Invalid location format");
        assert_eq!(resolver.resolve("north,east").await.label(), "Invalid coordinates");
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_resolve_degrades_on_failure_and_does_not_cache() {
        let service = CountingGeocoder::new(Behaviour::Fail);
        let resolver = resolver(service.clone());

        assert_eq!(resolver.resolve("6.9271,79.8612").await, Location::FailedToLoad);
        assert_eq!(resolver.resolve("6.9271,79.8612").await.label(), "Failed to load");
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let resolver = resolver(CountingGeocoder::new(Behaviour::NotFound));
        assert_eq!(resolver.resolve("0.0,0.0").await.label(), "Location not found");
    }

    #[tokio::test]
    async fn test_resolve_all_looks_up_each_distinct_key_once() {
        let service = CountingGeocoder::new(Behaviour::Found);
        let resolver = resolver(service.clone());

        let locations = resolver
            .resolve_all(["6.9271,79.8612", "", "7.2906,80.6337", "6.9271,79.8612"])
            .await;

        assert_eq!(locations.len(), 3);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
        assert_eq!(locations[""], Location::NoLocation);
        assert!(matches!(locations["7.2906,80.6337"], Location::Address(_)));
        assert_eq!(resolver.cache_len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_all_behind_rate_limiter_resolves_every_key() {
        // 15 keys at 20ms apart queue for ~280ms in total
        let service = CountingGeocoder::new(Behaviour::Throttled(RateLimiter::new(Duration::from_millis(20))));
        let resolver = resolver(service.clone());

        let keys: Vec<String> = (0..15).map(|i| format!("6.{:04},79.8612", 9000 + i)).collect();
        let locations = resolver.resolve_all(keys.iter().map(String::as_str)).await;

        assert_eq!(locations.len(), 15);
        let failed = locations.values().filter(|l| **l == Location::FailedToLoad).count();
        assert_eq!(failed, 0);
        assert!(locations.values().all(|l| matches!(l, Location::Address(_))));
        assert_eq!(resolver.cache_len(), 15);
        assert_eq!(service.calls.load(Ordering::SeqCst), 15);
    }
}
