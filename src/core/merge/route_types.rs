//! Route type code translation
//!
//! Exported feeds use the extended route type code set. Consumers that only
//! understand the classic GTFS codes (0-7) or Google's supported subset need
//! the codes collapsed during merge.

/// Fallback when an extended code has no Google-supported category
const GOOGLE_FALLBACK: i64 = 1700;

/// Extended route type codes accepted by Google as-is
const GOOGLE_SUPPORTED: &[i64] = &[
    0, 1, 2, 3, 4, 5, 6, 7,
    100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 114, 116, 117,
    200, 201, 202, 204, 206, 208,
    400, 401, 402, 403, 405,
    700, 701, 702, 704, 708, 715, 717,
    800,
    900, 901, 902, 903, 904, 905, 906,
    1000, 1100, 1300, 1400, 1500, 1501, 1700, 1702,
];

/// Collapses an extended route type code to the classic GTFS 0-7 set
///
/// Negative codes (unset markers) and the classic codes themselves pass
/// through unchanged. Returns `None` for codes with no classic equivalent
/// (e.g. air services); the merge keeps those values as-is.
pub fn to_basic_route_type(extended: i64) -> Option<i64> {
    if extended <= 7 {
        return Some(extended);
    }
    match extended / 100 {
        1 | 3 => Some(2),   // railway, suburban railway
        2 => Some(3),       // coach
        4..=6 => Some(1),   // urban railway, metro, underground
        7 | 8 => Some(3),   // bus, trolleybus
        9 => Some(0),       // tram
        10 | 12 => Some(4), // water transport, ferry
        13 => Some(6),      // telecabin
        14 => Some(7),      // funicular
        15..=17 => Some(3), // taxi, self-drive, miscellaneous
        _ => None,
    }
}

/// Maps an extended route type code to a Google-supported code
///
/// Codes Google supports pass through unchanged; otherwise the code is
/// collapsed to its century base, and if that is unsupported too, to the
/// miscellaneous service code.
pub fn to_google_route_type(extended: i64) -> i64 {
    if extended < 0 || GOOGLE_SUPPORTED.contains(&extended) {
        return extended;
    }
    let category = extended - extended % 100;
    if GOOGLE_SUPPORTED.contains(&category) {
        return category;
    }
    tracing::warn!(
        route_type = extended,
        fallback = GOOGLE_FALLBACK,
        "Extended route type has no Google-supported category"
    );
    GOOGLE_FALLBACK
}
