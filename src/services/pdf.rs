//! Print-ready PDF export of a single customer report
//!
//! A report is first rendered into a self-contained HTML document (summary
//! block plus activity table), then handed to a `PdfRasterizer`. The shipped
//! rasterizer drives the external `wkhtmltopdf` binary.

use std::process::Stdio;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tera::{Context, Tera};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::defaults::{PDF_MARGIN_MM, PDF_ORIENTATION, PDF_PAGE_SIZE, PDF_SCALE};
use crate::error::ExportError;
use crate::services::duration::describe_working_duration;
use crate::services::geocode_resolver::GeocodeResolver;
use crate::types::CustomerReport;

/// Page setup passed to the rasterizer
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub page_size: &'static str,
    pub orientation: &'static str,
    pub margin_mm: u32,
    /// Rasterization density relative to 96 dpi
    pub scale: f32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_size: PDF_PAGE_SIZE,
            orientation: PDF_ORIENTATION,
            margin_mm: PDF_MARGIN_MM,
            scale: PDF_SCALE,
        }
    }
}

impl PdfOptions {
    pub fn dpi(&self) -> u32 {
        (96.0 * self.scale).round() as u32
    }
}

/// One row of the activity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub time: String,
    pub location: String,
    pub status: String,
}

/// Fully rendered content of one customer's report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pub email: String,
    pub date: NaiveDate,
    pub customer_name: String,
    pub role: String,
    pub description: String,
    pub total_activities: usize,
    pub working_time: String,
    pub rows: Vec<ActivityRow>,
}

impl ReportDocument {
    /// Build the document, resolving every activity location.
    ///
    /// `directory_name` is used when the report itself carries no name.
    pub async fn build(
        report: &CustomerReport,
        email: &str,
        date: NaiveDate,
        directory_name: Option<&str>,
        resolver: &GeocodeResolver,
    ) -> Self {
        let locations = resolver
            .resolve_all(report.activities.iter().map(|a| a.location.as_str()))
            .await;

        let rows = report
            .activities
            .iter()
            .map(|a| ActivityRow {
                time: non_empty_or(&a.time, "N/A"),
                location: locations
                    .get(a.location.as_str())
                    .map(|l| l.label().to_string())
                    .unwrap_or_default(),
                status: non_empty_or(&a.status, "No status"),
            })
            .collect();

        let customer_name = if !report.customer_name.trim().is_empty() {
            report.customer_name.clone()
        } else {
            directory_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("Unknown")
                .to_string()
        };

        Self {
            email: email.to_string(),
            date,
            customer_name,
            role: non_empty_or(&report.role, "No role specified"),
            description: report.description.trim().to_string(),
            total_activities: report.activities.len(),
            working_time: describe_working_duration(&report.activities),
            rows,
        }
    }

    /// Download filename for this document
    pub fn filename(&self) -> String {
        pdf_filename(&self.email, self.date)
    }
}

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Customer Report {{ doc.email }} {{ doc.date }}</title>
<style>
body { font-family: sans-serif; color: #0f172a; }
.summary { border: 1px solid #e2e8f0; border-radius: 8px; padding: 16px; margin-bottom: 16px; }
.working { text-align: center; font-size: 18px; border-bottom: 1px solid #e2e8f0; padding-bottom: 12px; }
.grid { display: flex; justify-content: space-between; }
.label { color: #475569; font-size: 12px; margin: 0; }
.value { font-weight: bold; margin: 0; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 8px; border-bottom: 1px solid #e2e8f0; font-size: 12px; }
.mono { font-family: monospace; }
</style>
</head>
<body>
<div class="summary">
<h2>Report Summary</h2>
<div class="working"><strong>Estimated Working Time:</strong> {{ doc.working_time }}</div>
<div class="grid">
<div><p class="label">Customer</p><p class="value">{{ doc.customer_name }}</p></div>
<div><p class="label">Role</p><p class="value">{{ doc.role }}</p></div>
<div><p class="label">Total Activities</p><p class="value">{{ doc.total_activities }}</p></div>
</div>
{% if doc.description %}
<div class="description"><p class="label">Description</p><p>{{ doc.description }}</p></div>
{% endif %}
</div>
{% if doc.rows %}
<h3>Activities for {{ doc.customer_name }}</h3>
<table>
<thead><tr><th>Time</th><th>Location</th><th>Status</th></tr></thead>
<tbody>
{% for row in doc.rows %}<tr><td class="mono">{{ row.time }}</td><td>{{ row.location }}</td><td>{{ row.status }}</td></tr>
{% endfor %}</tbody>
</table>
{% else %}
<p class="empty">No activities found for this date</p>
{% endif %}
</body>
</html>
"#;

/// Renders report documents to HTML; values are autoescaped
pub struct HtmlRenderer {
    templates: Tera,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self, ExportError> {
        let mut templates = Tera::default();
        templates.add_raw_template("report.html", REPORT_TEMPLATE)?;
        Ok(Self { templates })
    }

    pub fn render(&self, document: &ReportDocument) -> Result<String, ExportError> {
        let mut context = Context::new();
        context.insert("doc", document);
        Ok(self.templates.render("report.html", &context)?)
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Download filename for a customer's daily PDF
pub fn pdf_filename(email: &str, date: NaiveDate) -> String {
    format!("Customer_Report_{}_{}.pdf", email, date)
}

/// Turns rendered HTML into PDF bytes
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    async fn rasterize(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError>;

    fn name(&self) -> &'static str;
}

/// Rasterizer backed by the `wkhtmltopdf` command line tool
pub struct WkhtmltopdfRasterizer {
    binary: String,
}

impl WkhtmltopdfRasterizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn args(options: &PdfOptions) -> Vec<String> {
        let margin = format!("{}mm", options.margin_mm);
        vec![
            "--quiet".to_string(),
            "--page-size".to_string(),
            options.page_size.to_string(),
            "--orientation".to_string(),
            options.orientation.to_string(),
            "--margin-top".to_string(),
            margin.clone(),
            "--margin-bottom".to_string(),
            margin.clone(),
            "--margin-left".to_string(),
            margin.clone(),
            "--margin-right".to_string(),
            margin,
            "--dpi".to_string(),
            options.dpi().to_string(),
            // stdin -> stdout
            "-".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl PdfRasterizer for WkhtmltopdfRasterizer {
    async fn rasterize(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
        debug!("Running {} at {} dpi", self.binary, options.dpi());

        let mut child = Command::new(&self.binary)
            .args(Self::args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(html.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ExportError::Render(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "wkhtmltopdf"
    }
}

/// A finished PDF ready to be saved
#[derive(Debug, Clone)]
pub struct PdfExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Rasterize a rendered report document on A4 portrait
pub async fn to_pdf(
    document: Option<&ReportDocument>,
    rasterizer: &dyn PdfRasterizer,
) -> Result<PdfExport, ExportError> {
    let document = document.ok_or(ExportError::RenderTargetMissing)?;

    let options = PdfOptions::default();
    let html = HtmlRenderer::new()?.render(document)?;
    let bytes = rasterizer.rasterize(&html, &options).await?;
    let filename = document.filename();

    info!("Rendered {} ({} bytes) via {}", filename, bytes.len(), rasterizer.name());
    Ok(PdfExport { filename, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::MockGeocoder;
    use crate::types::Activity;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Captures the HTML and options it was asked to rasterize
    #[derive(Default)]
    struct CapturingRasterizer {
        seen: Mutex<Option<(String, PdfOptions)>>,
    }

    #[async_trait]
    impl PdfRasterizer for CapturingRasterizer {
        async fn rasterize(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
            *self.seen.lock() = Some((html.to_string(), options.clone()));
            Ok(b"%PDF-1.4 fake".to_vec())
        }

        fn name(&self) -> &'static str {
            "capturing"
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()
    }

    fn report() -> CustomerReport {
        CustomerReport {
            customer_name: String::new(),
            role: String::new(),
            description: "Fixed <pump> & valve".to_string(),
            report_date: "2024-08-15".to_string(),
            activities: vec![
                Activity {
                    time: "08:30:00".to_string(),
                    location: "6.9271,79.8612".to_string(),
                    status: "starting working".to_string(),
                },
                Activity {
                    time: "09:00:30".to_string(),
                    location: "bad".to_string(),
                    status: "moving".to_string(),
                },
                Activity {
                    time: String::new(),
                    location: String::new(),
                    status: String::new(),
                },
            ],
        }
    }

    fn resolver() -> GeocodeResolver {
        GeocodeResolver::new(Arc::new(MockGeocoder::new()))
    }

    #[tokio::test]
    async fn test_build_document_fills_summary_and_placeholders() {
        let doc = ReportDocument::build(&report(), "ama@example.com", date(), Some("Ama"), &resolver()).await;

        assert_eq!(doc.customer_name, "Ama");
        assert_eq!(doc.role, "No role specified");
        assert_eq!(doc.total_activities, 3);
        assert_eq!(doc.working_time, "30 minutes 30 seconds");
        assert!(doc.rows[0].location.starts_with("Mock Street"));
        assert_eq!(doc.rows[1].location, "Invalid location format");
        assert_eq!(doc.rows[2].time, "N/A");
        assert_eq!(doc.rows[2].location, "No location");
        assert_eq!(doc.rows[2].status, "No status");
    }

    #[test]
    fn test_to_pdf_uses_a4_portrait_at_double_density() {
        let rasterizer = CapturingRasterizer::default();

        let export = tokio_test::block_on(async {
            let doc = ReportDocument::build(&report(), "ama@example.com", date(), None, &resolver()).await;
            to_pdf(Some(&doc), &rasterizer).await
        })
        .unwrap();

        assert_eq!(export.filename, "Customer_Report_ama@example.com_2024-08-15.pdf");
        assert!(export.bytes.starts_with(b"%PDF"));

        let (html, options) = rasterizer.seen.lock().clone().unwrap();
        assert_eq!(options.page_size, "A4");
        assert_eq!(options.orientation, "Portrait");
        assert_eq!(options.dpi(), 192);
        assert!(html.contains("Fixed &lt;pump&gt; &amp; valve"));
        assert!(html.contains("Estimated Working Time:</strong> 30 minutes 30 seconds"));
        assert!(html.contains("<p class=\"value\">Unknown</p>"));
    }

    #[tokio::test]
    async fn test_to_pdf_without_document_fails() {
        let rasterizer = CapturingRasterizer::default();
        let err = to_pdf(None, &rasterizer).await.unwrap_err();
        assert!(matches!(err, ExportError::RenderTargetMissing));
        assert!(rasterizer.seen.lock().is_none());
    }

    #[test]
    fn test_wkhtmltopdf_args() {
        let args = WkhtmltopdfRasterizer::args(&PdfOptions::default());
        let joined = args.join(" ");
        assert!(joined.contains("--page-size A4"));
        assert!(joined.contains("--orientation Portrait"));
        assert!(joined.contains("--margin-left 10mm"));
        assert!(joined.contains("--dpi 192"));
        assert!(joined.ends_with("- -"));
        // Density comes from --dpi alone; --zoom would scale the layout
        assert!(!joined.contains("--zoom"));
    }

    #[tokio::test]
    async fn test_renderer_escapes_values_and_lists_rows() {
        let mut source = report();
        source.activities[1].status = "<script>alert(1)</script>".to_string();
        let doc = ReportDocument::build(&source, "ama@example.com", date(), Some("Ama"), &resolver()).await;

        let html = HtmlRenderer::new().unwrap().render(&doc).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;&#x2F;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<h3>Activities for Ama</h3>"));
        assert_eq!(html.matches("<tr><td class=\"mono\">").count(), 3);
        assert!(html.contains("<p class=\"label\">Description</p>"));
    }

    #[tokio::test]
    async fn test_renderer_without_activities_shows_empty_state() {
        let mut source = report();
        source.activities.clear();
        source.description = "   ".to_string();
        let doc = ReportDocument::build(&source, "ama@example.com", date(), None, &resolver()).await;

        let html = HtmlRenderer::new().unwrap().render(&doc).unwrap();
        assert!(html.contains("No activities found for this date"));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("class=\"description\""));
        assert!(html.contains("Insufficient data"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_io_error() {
        let rasterizer = WkhtmltopdfRasterizer::new("/nonexistent/wkhtmltopdf");
        let err = rasterizer.rasterize("<p>x</p>", &PdfOptions::default()).await.unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
