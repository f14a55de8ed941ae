//! CLI argument parsing for the activity-reports binary.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "activity-reports", about = "Customer activity report aggregation and export")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List customers eligible for reports
    Customers,
    /// Show one customer's report for a day
    Individual {
        /// Customer email address
        #[arg(long)]
        email: String,
        /// Report date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Also save the report as PDF
        #[arg(long)]
        pdf: bool,
    },
    /// Overview of all customers for a day, exported as CSV
    Daily {
        /// Report date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Reports of all customers over a date range, exported as CSV
    Range {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },
    /// Server-side report of all users over a date range
    Group {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
        /// Also download the server-rendered PDF
        #[arg(long)]
        pdf: bool,
    },
}
