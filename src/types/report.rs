//! Report types

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One timestamped entry of a customer's activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Time of day, `HH:MM:SS`, local to the report day
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    /// Raw `"lat,lng"` string, possibly empty
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    /// Free-text status label
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// One customer on one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub report_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activities: Vec<Activity>,
}

impl CustomerReport {
    pub fn has_activities(&self) -> bool {
        !self.activities.is_empty()
    }

    /// Last entry in log order
    pub fn latest_activity(&self) -> Option<&Activity> {
        self.activities.last()
    }
}

/// A report together with the key it was fetched under.
///
/// Reports from the API do not carry the customer email, so grouping
/// has to go through the fetch key rather than report contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub email: String,
    pub date: NaiveDate,
    pub report: CustomerReport,
}

/// Ordered result of one aggregation call.
///
/// Date-major; within a date, fetch completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportBatch {
    entries: Vec<BatchEntry>,
    requested: usize,
}

impl ReportBatch {
    pub fn new(requested: usize) -> Self {
        Self {
            entries: Vec::new(),
            requested,
        }
    }

    #[cfg(test)]
    pub fn from_entries(entries: Vec<BatchEntry>) -> Self {
        let requested = entries.len();
        Self { entries, requested }
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn reports(&self) -> impl Iterator<Item = &CustomerReport> {
        self.entries.iter().map(|e| &e.report)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (customer, date) pairs that were asked for
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Pairs that were requested but did not make it into the batch
    pub fn dropped(&self) -> usize {
        self.requested.saturating_sub(self.entries.len())
    }

    /// Group entries by customer email, keeping batch order inside each group
    pub fn group_by_customer(&self) -> BTreeMap<&str, Vec<&BatchEntry>> {
        let mut groups: BTreeMap<&str, Vec<&BatchEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.email.as_str()).or_default().push(entry);
        }
        groups
    }
}

/// Per-customer totals over a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRangeSummary {
    pub email: String,
    pub customer_name: String,
    pub report_count: usize,
    pub activity_count: usize,
}

/// A resolved reverse-geocoding result, keyed by the exact coordinate string
#[derive(Debug, Clone, PartialEq)]
pub struct GeoAddress {
    pub coordinate_key: String,
    pub address: String,
    pub resolved_at: DateTime<Utc>,
}

// ============================================================================
// Group report (server-side aggregation over all users)
// ============================================================================

/// Request body for the all-users report endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReportEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_details: Vec<EventDetail>,
}

/// Headline numbers shown above a group report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReportSummary {
    pub total_users: usize,
    pub total_events: usize,
    pub period: String,
}

impl GroupReportSummary {
    pub fn from_entries(entries: &[GroupReportEntry], from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            total_users: entries.len(),
            total_events: entries.iter().map(|e| e.event_details.len()).sum(),
            period: format!("{} to {}", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, day: u32, activities: usize) -> BatchEntry {
        BatchEntry {
            email: email.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            report: CustomerReport {
                customer_name: email.to_uppercase(),
                role: String::new(),
                description: String::new(),
                report_date: format!("2024-03-{:02}", day),
                activities: vec![
                    Activity {
                        time: "08:00:00".to_string(),
                        location: String::new(),
                        status: "moving".to_string(),
                    };
                    activities
                ],
            },
        }
    }

    #[test]
    fn test_report_tolerates_null_fields() {
        let json = r#"{"customerName":"Ama","role":null,"description":null,"reportDate":"2024-03-01","activities":null}"#;
        let report: CustomerReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.customer_name, "Ama");
        assert_eq!(report.role, "");
        assert!(report.activities.is_empty());
    }

    #[test]
    fn test_batch_counts_dropped_pairs() {
        let mut batch = ReportBatch::new(4);
        batch.push(entry("a@x.lk", 1, 1));
        batch.push(entry("b@x.lk", 1, 2));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dropped(), 2);
    }

    #[test]
    fn test_group_by_customer_uses_email_key() {
        let batch = ReportBatch::from_entries(vec![
            entry("b@x.lk", 1, 1),
            entry("a@x.lk", 1, 2),
            entry("a@x.lk", 2, 3),
            entry("b@x.lk", 2, 0),
        ]);

        let groups = batch.group_by_customer();
        assert_eq!(groups.len(), 2);
        let a = &groups["a@x.lk"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].date.to_string(), "2024-03-01");
        assert_eq!(a[1].date.to_string(), "2024-03-02");
    }

    #[test]
    fn test_group_summary_totals() {
        let entries = vec![
            GroupReportEntry {
                customer_name: "Ama".to_string(),
                email: "ama@x.lk".to_string(),
                event_details: vec![
                    EventDetail {
                        date: "2024-03-01".to_string(),
                        location: String::new(),
                        time: "09:00:00".to_string(),
                        status: "starting working".to_string(),
                    };
                    3
                ],
            },
            GroupReportEntry {
                customer_name: "Kasun".to_string(),
                email: "kasun@x.lk".to_string(),
                event_details: vec![],
            },
        ];
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        let summary = GroupReportSummary::from_entries(&entries, from, to);
        assert_eq!(summary.total_users, 2);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.period, "2024-03-01 to 2024-03-07");
    }
}
