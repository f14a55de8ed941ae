//! Report API client
//!
//! The report service owns customers and activity logs; this module only
//! consumes it. `ReportSource` is the seam the aggregator is written
//! against, so tests can swap in an in-memory fake.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::types::{Customer, CustomerReport, GroupReportEntry, GroupReportRequest};

/// Source of per-customer, per-day reports
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch one customer's report for one calendar date
    async fn fetch_report(&self, email: &str, date: NaiveDate) -> Result<CustomerReport, FetchError>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Report API client configuration
#[derive(Debug, Clone)]
pub struct ReportApiConfig {
    /// Base URL including the `/api` prefix (e.g. "http://localhost:8088/api")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ReportApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088/api".to_string(),
            timeout_seconds: 15,
        }
    }
}

/// HTTP client for the report API
pub struct HttpReportSource {
    client: Client,
    config: ReportApiConfig,
}

impl HttpReportSource {
    pub fn new(config: ReportApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn report_url(&self, email: &str, date: NaiveDate) -> String {
        format!(
            "{}/report?email={}&date={}",
            self.base(),
            urlencoding::encode(email),
            date
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.config.timeout_seconds)
        } else {
            FetchError::Transport(e)
        }
    }

    /// Load the customer directory.
    ///
    /// A payload that is not a JSON array is treated as an empty directory.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let url = format!("{}/report/customers", self.base());
        debug!("Fetching customer directory from {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send customer directory request")?;

        if !response.status().is_success() {
            anyhow::bail!("Customer directory returned HTTP {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse customer directory response")?;

        if !body.is_array() {
            warn!("Customer directory payload is not an array, treating as empty");
            return Ok(Vec::new());
        }

        serde_json::from_value(body).context("Invalid customer record in directory")
    }

    /// Server-side aggregation of all users over a date range
    pub async fn fetch_group_report(&self, request: &GroupReportRequest) -> Result<Vec<GroupReportEntry>> {
        let url = format!("{}/report/generate-all-users-report-json", self.base());

        let response = self.client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send group report request")?;

        if !response.status().is_success() {
            anyhow::bail!("Group report returned HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse group report response")
    }

    /// Download the server-rendered PDF of the all-users report
    pub async fn download_group_pdf(&self, request: &GroupReportRequest) -> Result<Vec<u8>> {
        let url = format!(
            "{}/report/generate-all-users-report?startDate={}&endDate={}",
            self.base(),
            request.start_date,
            request.end_date
        );

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send group PDF request")?;

        if !response.status().is_success() {
            anyhow::bail!("Group PDF returned HTTP {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read group PDF body")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn fetch_report(&self, email: &str, date: NaiveDate) -> Result<CustomerReport, FetchError> {
        let url = self.report_url(email, date);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn name(&self) -> &str {
        "report-api"
    }
}
