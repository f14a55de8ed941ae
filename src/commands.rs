//! CLI command bodies
//!
//! Each command validates its input, wires the pipeline services together
//! and writes whatever artifact it produces into the export directory.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::services::aggregator::{aggregate, aggregate_range, summarize_by_customer};
use crate::services::date_range;
use crate::services::export::write_csv;
use crate::services::geocode_resolver::GeocodeResolver;
use crate::services::geocoding::create_geocoder;
use crate::services::overview::daily_overview;
use crate::services::pdf::{to_pdf, ReportDocument, WkhtmltopdfRasterizer};
use crate::services::report_source::{HttpReportSource, ReportApiConfig, ReportSource};
use crate::types::{directory_name, eligible_customers, GroupReportRequest, GroupReportSummary, ReportBatch};

const RETRY_PROMPT: &str = "Please check your connection and try again.";

fn report_source(config: &Config) -> Result<HttpReportSource> {
    HttpReportSource::new(ReportApiConfig {
        base_url: config.report_api_url.clone(),
        timeout_seconds: config.report_timeout.as_secs(),
    })
}

fn resolver(config: &Config) -> Result<GeocodeResolver> {
    Ok(GeocodeResolver::new(create_geocoder(config)?))
}

fn save(dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Saved {}", path.display());
    Ok(())
}

fn report_dropped(batch: &ReportBatch) {
    if batch.dropped() > 0 {
        warn!("{} of {} requested reports could not be fetched", batch.dropped(), batch.requested());
        println!(
            "Note: {} of {} requested reports are missing from this export.",
            batch.dropped(),
            batch.requested()
        );
    }
}

pub async fn customers(config: &Config) -> Result<()> {
    let source = report_source(config)?;
    let directory = source
        .list_customers()
        .await
        .with_context(|| format!("Failed to load customers. {}", RETRY_PROMPT))?;

    let eligible = eligible_customers(&directory);
    if eligible.is_empty() {
        println!("No customers available");
        return Ok(());
    }

    for c in &eligible {
        println!("{:>5}  {:<30} {:<35} {}", c.id, c.customer_name, c.email, c.role);
    }
    info!("{} of {} customers eligible", eligible.len(), directory.len());
    Ok(())
}

pub async fn individual(config: &Config, email: &str, date: NaiveDate, pdf: bool) -> Result<()> {
    if email.trim().is_empty() {
        anyhow::bail!("Please select both a customer and a date");
    }
    let email = email.trim();

    let source = report_source(config)?;

    // The directory only supplies a fallback name; a failure here is not fatal
    let fallback_name = match source.list_customers().await {
        Ok(list) => directory_name(&list, email),
        Err(e) => {
            warn!("Customer directory unavailable: {:#}", e);
            None
        }
    };

    let document = match source.fetch_report(email, date).await {
        Ok(report) => {
            let resolver = resolver(config)?;
            Some(ReportDocument::build(&report, email, date, fallback_name.as_deref(), &resolver).await)
        }
        Err(e) => {
            error!(%email, %date, "Error fetching report: {}", e);
            println!("Failed to fetch report. Please try again.");
            None
        }
    };

    if let Some(doc) = &document {
        println!("Report Summary");
        println!("  Estimated Working Time: {}", doc.working_time);
        println!("  Customer:         {}", doc.customer_name);
        println!("  Role:             {}", doc.role);
        println!("  Total Activities: {}", doc.total_activities);
        if !doc.description.trim().is_empty() {
            println!("  Description:      {}", doc.description);
        }
        if doc.rows.is_empty() {
            println!("No activities found for this date");
        }
        for row in &doc.rows {
            println!("  {:<10} {:<40} {}", row.time, row.location, row.status);
        }
    }

    if pdf {
        let rasterizer = WkhtmltopdfRasterizer::new(config.wkhtmltopdf_bin.clone());
        let export = to_pdf(document.as_ref(), &rasterizer).await?;
        save(&config.export_dir, &export.filename, &export.bytes)?;
    }

    Ok(())
}

pub async fn daily(config: &Config, date: NaiveDate) -> Result<()> {
    let source = report_source(config)?;
    let directory = source
        .list_customers()
        .await
        .with_context(|| format!("Failed to load customers. {}", RETRY_PROMPT))?;

    println!("Fetching reports for all customers... This may take a moment.");
    let batch = aggregate(&source, &directory, &[date])
        .await
        .with_context(|| format!("Failed to fetch daily reports. {}", RETRY_PROMPT))?;

    let resolver = resolver(config)?;
    let rows = daily_overview(&batch, &resolver).await;
    if rows.is_empty() {
        println!("No reports found for {}", date);
    } else {
        println!(
            "Daily Overview - {} ({} customer{} with activity)",
            date,
            rows.len(),
            if rows.len() == 1 { "" } else { "s" }
        );
        for row in &rows {
            println!(
                "  {:<25} {:<12} {:>3} activities  latest {} @ {}",
                row.customer_name, row.role, row.activity_count, row.latest_time, row.latest_location
            );
        }
    }

    report_dropped(&batch);
    if !batch.is_empty() {
        write_csv(&config.export_dir, &batch, date, date)?;
    }
    Ok(())
}

pub async fn range(config: &Config, from: NaiveDate, to: NaiveDate) -> Result<()> {
    // Reject bad ranges before touching the network
    date_range::span_days(from, to)?;

    let source = report_source(config)?;
    let directory = source
        .list_customers()
        .await
        .with_context(|| format!("Failed to load customers. {}", RETRY_PROMPT))?;

    let batch = aggregate_range(&source, &directory, from, to)
        .await
        .with_context(|| format!("Failed to fetch reports. {}", RETRY_PROMPT))?;

    for summary in summarize_by_customer(&batch) {
        println!(
            "  {:<25} {:<35} {:>3} days {:>5} activities",
            summary.customer_name, summary.email, summary.report_count, summary.activity_count
        );
    }

    report_dropped(&batch);
    if batch.is_empty() {
        println!("No reports found for {} to {}", from, to);
        return Ok(());
    }

    write_csv(&config.export_dir, &batch, from, to)?;
    Ok(())
}

pub async fn group(config: &Config, from: NaiveDate, to: NaiveDate, pdf: bool) -> Result<()> {
    // Server-side aggregation; only the ordering is checked here
    date_range::ensure_ordered(from, to)?;
    let request = GroupReportRequest {
        start_date: from,
        end_date: to,
    };

    let source = report_source(config)?;
    let entries = source
        .fetch_group_report(&request)
        .await
        .context("Failed to generate report")?;

    let summary = GroupReportSummary::from_entries(&entries, from, to);
    println!("Report Summary");
    println!("  Total Users:   {}", summary.total_users);
    println!("  Total Events:  {}", summary.total_events);
    println!("  Report Period: {}", summary.period);

    for entry in &entries {
        println!("{} <{}> - {} events", entry.customer_name, entry.email, entry.event_details.len());
        if entry.event_details.is_empty() {
            println!("  No events found for this user");
        }
        for event in &entry.event_details {
            println!("  {} {} {:<20} {}", event.date, event.time, event.status, event.location);
        }
    }

    if pdf {
        let bytes = source
            .download_group_pdf(&request)
            .await
            .context("Failed to download group report PDF")?;
        save(
            &config.export_dir,
            &format!("group_report_{}_to_{}.pdf", from, to),
            &bytes,
        )?;
    }

    Ok(())
}
