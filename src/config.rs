//! Configuration management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Report API base URL, including the `/api` prefix
    pub report_api_url: String,

    /// Per-request timeout for the report API
    pub report_timeout: Duration,

    /// Nominatim API URL (for reverse geocoding)
    pub nominatim_url: String,

    /// "mock" or "nominatim"
    pub geocoder_backend: String,

    /// Minimum interval between Nominatim requests
    pub nominatim_rate_limit: Duration,

    /// Consecutive failures before the geocoder stops calling Nominatim
    pub nominatim_cb_threshold: u32,

    /// How long the geocoder circuit stays open
    pub nominatim_cb_recovery: Duration,

    /// Per-lookup timeout for reverse geocoding
    pub geocode_timeout: Duration,

    /// Directory exported CSV/PDF files are written to
    pub export_dir: PathBuf,

    /// Path or name of the wkhtmltopdf binary
    pub wkhtmltopdf_bin: String,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let report_api_url = string_or("REPORT_API_URL", "http://localhost:8088/api");
        let nominatim_url = string_or("NOMINATIM_URL", "https://nominatim.openstreetmap.org");
        let geocoder_backend = string_or("GEOCODER_BACKEND", "nominatim").to_lowercase();
        let export_dir = PathBuf::from(string_or("EXPORT_DIR", "./exports"));
        let wkhtmltopdf_bin = string_or("WKHTMLTOPDF_BIN", "wkhtmltopdf");

        let report_timeout_secs: u64 = parse_or(&lookup, "REPORT_TIMEOUT_SECS", 15)?;
        let geocode_timeout_secs: u64 = parse_or(&lookup, "GEOCODE_TIMEOUT_SECS", 10)?;
        let rate_limit_ms: u64 = parse_or(&lookup, "NOMINATIM_RATE_LIMIT_MS", 1000)?;
        let nominatim_cb_threshold: u32 = parse_or(&lookup, "NOMINATIM_CB_THRESHOLD", 3)?;
        let cb_recovery_secs: u64 = parse_or(&lookup, "NOMINATIM_CB_RECOVERY_SECS", 300)?;

        if report_timeout_secs == 0 || geocode_timeout_secs == 0 {
            anyhow::bail!("REPORT_TIMEOUT_SECS and GEOCODE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            report_api_url,
            report_timeout: Duration::from_secs(report_timeout_secs),
            nominatim_url,
            geocoder_backend,
            nominatim_rate_limit: Duration::from_millis(rate_limit_ms),
            nominatim_cb_threshold,
            nominatim_cb_recovery: Duration::from_secs(cb_recovery_secs),
            geocode_timeout: Duration::from_secs(geocode_timeout_secs),
            export_dir,
            wkhtmltopdf_bin,
        })
    }

    /// Defaults with the mock geocoder, no environment involved
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let mut config = Self::from_lookup(|_| None).expect("defaults are valid");
        config.geocoder_backend = "mock".to_string();
        config
    }
}
