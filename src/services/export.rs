//! CSV export of aggregated report batches
//!
//! One row per report, columns in `CustomerReport` declaration order. The
//! activity log is carried in its column as a JSON array so the row can
//! be read back without loss. Fields are quoted only when they contain a
//! delimiter, quote or newline, so plain rows match a naive comma join.
//!
//! An empty batch serializes to an empty document (no header row);
//! persisting an empty batch is refused with `ExportError::EmptyBatch`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::types::{CustomerReport, ReportBatch};

/// Column order of the exported document
pub const CSV_COLUMNS: [&str; 5] = ["customerName", "role", "description", "reportDate", "activities"];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvReportRow {
    customer_name: String,
    role: String,
    description: String,
    report_date: String,
    activities: String,
}

impl CsvReportRow {
    fn from_report(report: &CustomerReport) -> Result<Self, ExportError> {
        Ok(Self {
            customer_name: report.customer_name.clone(),
            role: report.role.clone(),
            description: report.description.clone(),
            report_date: report.report_date.clone(),
            activities: serde_json::to_string(&report.activities)?,
        })
    }

    #[cfg(test)]
    fn into_report(self) -> Result<CustomerReport, ExportError> {
        let activities = if self.activities.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.activities)?
        };

        Ok(CustomerReport {
            customer_name: self.customer_name,
            role: self.role,
            description: self.description,
            report_date: self.report_date,
            activities,
        })
    }
}

/// Download filename for a range export
pub fn csv_filename(from: NaiveDate, to: NaiveDate) -> String {
    format!("daily_report_{}_to_{}.csv", from, to)
}

/// Serialize a batch to CSV bytes
pub fn to_csv(batch: &ReportBatch) -> Result<Vec<u8>, ExportError> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_COLUMNS)?;
    for report in batch.reports() {
        writer.serialize(CsvReportRow::from_report(report)?)?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Parse a previously exported document back into reports
#[cfg(test)]
pub fn read_csv(bytes: &[u8]) -> Result<Vec<CustomerReport>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    reader
        .deserialize::<CsvReportRow>()
        .map(|row| row.map_err(ExportError::from).and_then(CsvReportRow::into_report))
        .collect()
}

/// Write a batch to `<dir>/daily_report_<from>_to_<to>.csv`
pub fn write_csv(
    dir: &Path,
    batch: &ReportBatch,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PathBuf, ExportError> {
    if batch.is_empty() {
        return Err(ExportError::EmptyBatch);
    }

    let bytes = to_csv(batch)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(csv_filename(from, to));
    std::fs::write(&path, &bytes)?;

    info!("Wrote {} reports ({} bytes) to {}", batch.len(), bytes.len(), path.display());
    Ok(path)
}
