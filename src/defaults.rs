//! Fixed pipeline constants

/// Longest inclusive date span a range query may cover
pub const MAX_RANGE_DAYS: i64 = 45;

/// Status label that opens a working session
pub const START_STATUS: &str = "starting working";

// Location cell sentinels
pub const NO_LOCATION: &str = "No location";
pub const INVALID_FORMAT: &str = "Invalid location format";
pub const INVALID_COORDINATES: &str = "Invalid coordinates";
pub const LOCATION_NOT_FOUND: &str = "Location not found";
pub const FAILED_TO_LOAD: &str = "Failed to load";

/// Shown when no start/stop pair can be found
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

// PDF page setup
pub const PDF_SCALE: f32 = 2.0;
pub const PDF_MARGIN_MM: u32 = 10;
pub const PDF_PAGE_SIZE: &str = "A4";
pub const PDF_ORIENTATION: &str = "Portrait";
