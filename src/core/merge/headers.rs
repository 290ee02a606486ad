//! Target header lists for merged GTFS files
//!
//! Merged rows are projected onto these header lists, not the source
//! file's. The source may have fields in any order or omit optional ones;
//! the merged output always has the canonical layout below.

/// File names processed by the merge engine. Zip entries outside this
/// whitelist are ignored.
pub const GTFS_FILE_NAMES: [&str; 9] = [
    "agency.txt",
    "calendar.txt",
    "calendar_dates.txt",
    "routes.txt",
    "shapes.txt",
    "stops.txt",
    "stop_times.txt",
    "trips.txt",
    "transfers.txt",
];

/// Returns the target header list for a whitelisted GTFS file
///
/// # Panics
///
/// Panics for file names outside [`GTFS_FILE_NAMES`]; the merge engine only
/// processes whitelisted entries, so hitting this is a programming error.
pub fn target_headers(entry_name: &str) -> &'static [&'static str] {
    match entry_name {
        "agency.txt" => &[
            "agency_id",
            "agency_name",
            "agency_url",
            "agency_timezone",
            "agency_lang",
            "agency_phone",
        ],
        "calendar.txt" => &[
            "service_id",
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
            "start_date",
            "end_date",
        ],
        "calendar_dates.txt" => &["service_id", "date", "exception_type"],
        "routes.txt" => &[
            "route_id",
            "agency_id",
            "route_short_name",
            "route_long_name",
            "route_desc",
            "route_type",
            "route_url",
            "route_color",
            "route_text_color",
        ],
        "shapes.txt" => &[
            "shape_id",
            "shape_pt_lat",
            "shape_pt_lon",
            "shape_pt_sequence",
            "shape_dist_traveled",
        ],
        "stops.txt" => &[
            "stop_id",
            "stop_code",
            "stop_name",
            "stop_desc",
            "stop_lat",
            "stop_lon",
            "zone_id",
            "stop_url",
            "location_type",
            "parent_station",
            "stop_timezone",
            "vehicle_type",
            "wheelchair_boarding",
            "platform_code",
        ],
        "stop_times.txt" => &[
            "trip_id",
            "arrival_time",
            "departure_time",
            "stop_id",
            "stop_sequence",
            "stop_headsign",
            "pickup_type",
            "drop_off_type",
            "shape_dist_traveled",
        ],
        "trips.txt" => &[
            "route_id",
            "service_id",
            "trip_id",
            "trip_headsign",
            "trip_short_name",
            "direction_id",
            "block_id",
            "shape_id",
            "wheelchair_accessible",
        ],
        "transfers.txt" => &[
            "from_stop_id",
            "to_stop_id",
            "transfer_type",
            "min_transfer_time",
        ],
        other => panic!("No target headers for GTFS entry {other}"),
    }
}
