//! Customer types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Customer entity as returned by the report API directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl Customer {
    /// A customer can be selected for a report only when both the
    /// name and the email carry something other than whitespace.
    pub fn is_eligible(&self) -> bool {
        !self.email.trim().is_empty() && !self.customer_name.trim().is_empty()
    }
}

/// Filter a customer list down to the fan-out set.
///
/// Drops ineligible customers and repeated emails (first occurrence wins),
/// preserving input order.
pub fn eligible_customers(customers: &[Customer]) -> Vec<Customer> {
    let mut seen = HashSet::new();
    customers
        .iter()
        .filter(|c| c.is_eligible())
        .filter(|c| seen.insert(c.email.trim().to_string()))
        .cloned()
        .collect()
}

/// Directory name for an email, matched on trimmed values
pub fn directory_name(customers: &[Customer], email: &str) -> Option<String> {
    let email = email.trim();
    customers
        .iter()
        .find(|c| c.email.trim() == email)
        .map(|c| c.customer_name.clone())
}

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}
