//! Type definitions

pub mod customer;
pub mod report;

pub use customer::*;
pub use report::*;
