//! Daily overview table: one row per customer with activity that day

use crate::services::geocode_resolver::GeocodeResolver;
use crate::types::ReportBatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyOverviewRow {
    pub email: String,
    pub customer_name: String,
    pub role: String,
    pub description: String,
    pub report_date: String,
    pub activity_count: usize,
    pub latest_time: String,
    pub latest_location: String,
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// Build overview rows, skipping reports without activities.
///
/// Latest-activity locations are resolved concurrently, one lookup per
/// distinct coordinate string.
pub async fn daily_overview(batch: &ReportBatch, resolver: &GeocodeResolver) -> Vec<DailyOverviewRow> {
    let with_activity: Vec<_> = batch
        .entries()
        .iter()
        .filter(|e| e.report.has_activities())
        .collect();

    let locations = resolver
        .resolve_all(
            with_activity
                .iter()
                .filter_map(|e| e.report.latest_activity())
                .map(|a| a.location.as_str()),
        )
        .await;

    with_activity
        .into_iter()
        .map(|entry| {
            let report = &entry.report;
            let latest = report.latest_activity();
            DailyOverviewRow {
                email: entry.email.clone(),
                customer_name: or_placeholder(&report.customer_name, "Unknown Customer"),
                role: or_placeholder(&report.role, "No role"),
                description: or_placeholder(&report.description, "No description"),
                report_date: or_placeholder(&report.report_date, "Unknown date"),
                activity_count: report.activities.len(),
                latest_time: latest.map(|a| a.time.clone()).unwrap_or_default(),
                latest_location: latest
                    .and_then(|a| locations.get(a.location.as_str()))
                    .map(|l| l.label().to_string())
                    .unwrap_or_default(),
            }
        })
        .collect()
}
