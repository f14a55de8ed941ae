//! Nominatim reverse-geocoding client

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Coordinates;

#[derive(Debug, Default, Deserialize)]
pub struct NominatimReverseAddress {
    pub road: Option<String>,
    pub house_number: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub postcode: Option<String>,
}

/// Nominatim reverse API response.
///
/// Coordinates with nothing nearby come back as HTTP 200 with only an
/// `error` field set.
#[derive(Debug, Deserialize)]
pub struct NominatimReverseResult {
    pub display_name: Option<String>,
    pub address: Option<NominatimReverseAddress>,
    pub error: Option<String>,
}

/// Nominatim geocoding client
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    /// Create a new client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ActivityReports/0.1 (reverse geocoding)")
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn reverse_url(&self, coords: Coordinates) -> String {
        format!(
            "{}/reverse?format=json&lat={}&lon={}&addressdetails=1",
            self.base_url, coords.lat, coords.lng
        )
    }

    /// Reverse geocode coordinates to address
    pub async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<ReverseGeocodeOutput>> {
        let url = self.reverse_url(coords);

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send reverse geocoding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Nominatim returned HTTP {}", response.status());
        }

        let result: NominatimReverseResult = response
            .json()
            .await
            .context("Failed to parse reverse geocoding response")?;

        Ok(ReverseGeocodeOutput::from_result(result))
    }
}

/// Address fields relevant for a short display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseGeocodeOutput {
    pub street: String,
    pub locality: String,
    pub postal_code: String,
    pub display_name: String,
}

impl ReverseGeocodeOutput {
    fn from_result(result: NominatimReverseResult) -> Option<Self> {
        if result.error.is_some() {
            return None;
        }

        let address = result.address.unwrap_or_default();
        let locality = address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.suburb)
            .unwrap_or_default();
        let street = match (address.road, address.house_number) {
            (Some(road), Some(number)) => format!("{} {}", road, number),
            (Some(road), None) => road,
            _ => String::new(),
        };
        let display_name = result.display_name.unwrap_or_default();

        if street.is_empty() && locality.is_empty() && display_name.trim().is_empty() {
            return None;
        }

        Some(Self {
            street,
            locality,
            postal_code: address.postcode.unwrap_or_default(),
            display_name,
        })
    }

    /// Street + locality when both are known, otherwise the first two
    /// comma-separated segments of the full display name
    pub fn short_label(&self) -> String {
        if !self.street.is_empty() && !self.locality.is_empty() {
            return format!("{}, {}", self.street, self.locality);
        }

        let head: Vec<&str> = self.display_name.split(',').take(2).collect();
        let label = head.join(",").trim().to_string();
        if label.is_empty() {
            if self.street.is_empty() { self.locality.clone() } else { self.street.clone() }
        } else {
            label
        }
    }
}
