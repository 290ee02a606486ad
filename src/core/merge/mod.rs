//! GTFS merge/dedup engine
//!
//! Combines per-provider export archives into one feed, removing duplicate
//! stop and transfer records and normalizing field values on the way.

pub mod archive;
pub mod headers;
pub mod merger;
pub mod route_types;

// Re-export commonly used items
pub use archive::{is_zip_file, zip_directory};
pub use headers::{target_headers, GTFS_FILE_NAMES};
pub use merger::{GtfsExportVariant, GtfsMerger};
