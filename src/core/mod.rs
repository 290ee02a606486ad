//! Business logic
//!
//! The job orchestration engine ([`pipeline`]), the status event channel
//! ([`events`]) and the GTFS merge/dedup engine ([`merge`]).

pub mod events;
pub mod merge;
pub mod pipeline;
