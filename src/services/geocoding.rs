//! Reverse-geocoding abstraction layer with safety features
//!
//! This module provides a safe geocoding architecture that:
//! - Never risks getting blocked by external services
//! - Uses MockGeocoder for tests and offline runs (deterministic, no network)
//! - Uses RateLimitedNominatimGeocoder for production (strict rate limiting)
//!
//! Backend selection via the GEOCODER_BACKEND setting:
//! - "mock" → MockGeocoder
//! - "nominatim" → RateLimitedNominatimGeocoder

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::error::GeocodeError;
use crate::services::nominatim::NominatimClient;
use crate::types::Coordinates;

/// Geocoder trait - abstraction for all reverse-geocoding implementations
///
/// Implementations bound their own network calls; callers may queue many
/// lookups at once and must not be failed for time spent waiting on a
/// rate limiter.
#[async_trait]
pub trait GeocodeService: Send + Sync {
    /// Look up a display address for coordinates.
    /// Returns None if nothing is known at that position.
    async fn reverse(&self, coords: Coordinates) -> Result<Option<ReverseGeocodingResult>, GeocodeError>;

    /// Get the name of this geocoder implementation
    fn name(&self) -> &'static str;
}

/// Result of a reverse-geocoding lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseGeocodingResult {
    /// Short label for a table cell
    pub label: String,
    /// Full provider display name
    pub display_name: String,
}

// ==========================================================================
// MockGeocoder Implementation
// ==========================================================================

/// Mock geocoder - returns deterministic fake addresses
pub struct MockGeocoder;

impl MockGeocoder {
    pub fn new() -> Self {
        Self
    }

    fn hash_coordinates(coords: Coordinates) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        coords.lat.to_bits().hash(&mut hasher);
        coords.lng.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeocodeService for MockGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<Option<ReverseGeocodingResult>, GeocodeError> {
        let hash = Self::hash_coordinates(coords);
        let label = format!("Mock Street {}, Mock City {}", hash % 100, (hash >> 32) % 10);

        Ok(Some(ReverseGeocodingResult {
            display_name: format!("{}, Mock Province, Mockland", label),
            label,
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ==========================================================================
// RateLimiter Implementation
// ==========================================================================

/// Rate limiter that enforces minimum interval between calls
pub struct RateLimiter {
    last_call: tokio::sync::Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: tokio::sync::Mutex::new(None),
            min_interval,
        }
    }

    /// Wait until it's safe to make another call.
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind each other instead of firing together.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ==========================================================================
// CircuitBreaker Implementation
// ==========================================================================

/// Circuit breaker to prevent hammering a failing service
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: parking_lot::Mutex<Option<Instant>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: parking_lot::Mutex::new(None),
            recovery_time,
        }
    }

    /// Check if circuit is open (blocking calls)
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }
        match *self.last_failure.lock() {
            // Half-open once the recovery time has passed
            Some(last_time) => last_time.elapsed() < self.recovery_time,
            None => true,
        }
    }

    /// Record a failure
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(Instant::now());
    }

    /// Record a success (resets failure count)
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }
}

// ==========================================================================
// RateLimitedNominatimGeocoder Implementation
// ==========================================================================

/// Rate-limited Nominatim reverse geocoder with circuit breaker protection
pub struct RateLimitedNominatimGeocoder {
    client: NominatimClient,
    rate_limiter: RateLimiter,
    request_timeout: Duration,
    /// Circuit breaker - pub(crate) for testing
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl RateLimitedNominatimGeocoder {
    /// Create with explicit settings
    pub fn with_config(
        base_url: &str,
        request_timeout: Duration,
        rate_limit_interval: Duration,
        circuit_breaker_threshold: u32,
        circuit_breaker_recovery: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: NominatimClient::new(base_url, request_timeout)?,
            rate_limiter: RateLimiter::new(rate_limit_interval),
            request_timeout,
            circuit_breaker: CircuitBreaker::new(circuit_breaker_threshold, circuit_breaker_recovery),
        })
    }

    /// Create from loaded application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(
            &config.nominatim_url,
            config.geocode_timeout,
            config.nominatim_rate_limit,
            config.nominatim_cb_threshold,
            config.nominatim_cb_recovery,
        )
    }
}

#[async_trait]
impl GeocodeService for RateLimitedNominatimGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<Option<ReverseGeocodingResult>, GeocodeError> {
        // Check circuit breaker first
        if self.circuit_breaker.is_open() {
            tracing::warn!("Circuit breaker is open, rejecting reverse geocoding request");
            return Err(GeocodeError::CircuitOpen);
        }

        self.rate_limiter.wait().await;

        // Timed from the granted slot, not from when the caller queued
        let lookup = match tokio::time::timeout(self.request_timeout, self.client.reverse_geocode(coords)).await {
            Ok(result) => result,
            Err(_) => {
                self.circuit_breaker.record_failure();
                tracing::warn!("Reverse geocoding timed out after {:?}", self.request_timeout);
                return Err(GeocodeError::Timeout(self.request_timeout.as_secs()));
            }
        };

        match lookup {
            Ok(Some(output)) => {
                self.circuit_breaker.record_success();
                Ok(Some(ReverseGeocodingResult {
                    label: output.short_label(),
                    display_name: output.display_name,
                }))
            }
            Ok(None) => {
                // No result found is not a failure
                self.circuit_breaker.record_success();
                Ok(None)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                tracing::error!("Reverse geocoding failed: {:#}", e);
                Err(GeocodeError::Unavailable(e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

// ==========================================================================
// Factory function
// ==========================================================================

/// Create geocoder based on the configured backend
pub fn create_geocoder(config: &Config) -> Result<Arc<dyn GeocodeService>> {
    match config.geocoder_backend.as_str() {
        "mock" => {
            tracing::info!("Using MockGeocoder");
            Ok(Arc::new(MockGeocoder::new()))
        }
        "nominatim" => {
            tracing::info!("Using RateLimitedNominatimGeocoder at {}", config.nominatim_url);
            Ok(Arc::new(RateLimitedNominatimGeocoder::from_config(config)?))
        }
        other => {
            tracing::warn!("Unknown GEOCODER_BACKEND '{}', using mock", other);
            Ok(Arc::new(MockGeocoder::new()))
        }
    }
}
