//! Identifiers and timestamps shared by all entities
//!
//! Every row id is a UUIDv7 string: a 48-bit millisecond timestamp followed by
//! random bits, so ids sort by creation time and never collide in practice.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Generate a new time-ordered unique identifier
pub fn generate() -> String {
    Uuid::now_v7().to_string()
}

/// Current time for a freshly created row
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Timestamp for a modification of a row last touched at `previous`.
///
/// Always strictly later than `previous`, even if the clock has not advanced
/// (or has stepped backwards) since.
pub fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
