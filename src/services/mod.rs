//! Report pipeline services

pub mod aggregator;
pub mod date_range;
pub mod duration;
pub mod export;
pub mod geocode_resolver;
pub mod geocoding;
pub mod nominatim;
pub mod overview;
pub mod pdf;
pub mod report_source;
