//! Report aggregation
//!
//! Fans out one fetch per eligible customer for a date, waits for every
//! fetch of that date to settle, then moves on to the next date. Load on
//! the report API is bounded to one date's worth of customers at a time.
//!
//! Failed fetches are dropped from the batch (and logged); the whole call
//! only fails when the report API could not be reached for any pair.

use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{AggregateError, FetchError};
use crate::services::date_range;
use crate::services::report_source::ReportSource;
use crate::types::{eligible_customers, BatchEntry, Customer, CustomerRangeSummary, ReportBatch};

/// Settled result of one (customer, date) fetch
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(BatchEntry),
    Failed {
        email: String,
        date: NaiveDate,
        error: FetchError,
    },
}

/// Running tally of settled fetches for one aggregation call
#[derive(Debug, Default)]
struct Tally {
    succeeded: usize,
    failed: usize,
    unreachable: usize,
    last_error: Option<String>,
}

impl Tally {
    fn record_failure(&mut self, error: &FetchError) {
        self.failed += 1;
        if error.is_unreachable() {
            self.unreachable += 1;
        }
        self.last_error = Some(error.to_string());
    }

    /// Nothing came back and every failure was a connectivity failure
    fn transport_down(&self) -> bool {
        self.succeeded == 0 && self.failed > 0 && self.unreachable == self.failed
    }
}

async fn fetch_one<S>(source: &S, email: String, date: NaiveDate) -> FetchOutcome
where
    S: ReportSource + ?Sized,
{
    match source.fetch_report(&email, date).await {
        Ok(report) => FetchOutcome::Fetched(BatchEntry { email, date, report }),
        Err(error) => FetchOutcome::Failed { email, date, error },
    }
}

/// Fetch every (eligible customer, date) pair and assemble the batch.
///
/// Dates are processed in the given order. Within a date the entries are
/// appended in completion order, so callers must group by
/// [`BatchEntry::email`] rather than by position.
pub async fn aggregate<S>(
    source: &S,
    customers: &[Customer],
    dates: &[NaiveDate],
) -> Result<ReportBatch, AggregateError>
where
    S: ReportSource + ?Sized,
{
    let eligible = eligible_customers(customers);
    let requested = eligible.len() * dates.len();
    let span = info_span!("aggregate", run_id = %Uuid::new_v4(), source = source.name());

    async move {
        info!(
            "Aggregating {} customers x {} dates ({} of {} customers eligible)",
            eligible.len(),
            dates.len(),
            eligible.len(),
            customers.len()
        );

        let mut batch = ReportBatch::new(requested);
        let mut tally = Tally::default();

        for &date in dates {
            let mut pending: FuturesUnordered<_> = eligible
                .iter()
                .map(|c| fetch_one(source, c.email.trim().to_string(), date))
                .collect();

            // Barrier: drain every fetch for this date before the next one
            while let Some(outcome) = pending.next().await {
                match outcome {
                    FetchOutcome::Fetched(entry) => {
                        debug!(email = %entry.email, %date, "Report fetched");
                        tally.succeeded += 1;
                        batch.push(entry);
                    }
                    FetchOutcome::Failed { email, date, error } => {
                        warn!(%email, %date, "Dropping report: {}", error);
                        tally.record_failure(&error);
                    }
                }
            }
        }

        if tally.transport_down() {
            return Err(AggregateError::BatchFailed {
                requested,
                reason: tally.last_error.unwrap_or_else(|| "report API unreachable".to_string()),
            });
        }

        info!(
            "Aggregation finished: {} reports, {} dropped",
            tally.succeeded, tally.failed
        );
        Ok(batch)
    }
    .instrument(span)
    .await
}

/// Validate and expand a date range, then aggregate over it
pub async fn aggregate_range<S>(
    source: &S,
    customers: &[Customer],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ReportBatch, AggregateError>
where
    S: ReportSource + ?Sized,
{
    let dates = date_range::expand(start, end)?;
    aggregate(source, customers, &dates).await
}

/// Per-customer report and activity totals, keyed by email
pub fn summarize_by_customer(batch: &ReportBatch) -> Vec<CustomerRangeSummary> {
    batch
        .group_by_customer()
        .into_iter()
        .map(|(email, entries)| CustomerRangeSummary {
            email: email.to_string(),
            customer_name: entries
                .iter()
                .map(|e| e.report.customer_name.as_str())
                .find(|name| !name.is_empty())
                .unwrap_or_default()
                .to_string(),
            report_count: entries.len(),
            activity_count: entries.iter().map(|e| e.report.activities.len()).sum(),
        })
        .collect()
}
