//! Conversion between the wire timestamp (`google.protobuf.Timestamp`) and
//! the storage timestamp (`chrono::DateTime<Utc>`).
//!
//! The accepted range matches the protobuf definition:
//! `0001-01-01T00:00:00Z` through `9999-12-31T23:59:59.999999999Z`, with
//! `nanos` in `[0, 1e9)`.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use prost_types::Timestamp;

/// Seconds of `0001-01-01T00:00:00Z` relative to the Unix epoch.
pub const MIN_VALID_SECONDS: i64 = -62_135_596_800;

/// Seconds of `9999-12-31T23:59:59Z` relative to the Unix epoch.
pub const MAX_VALID_SECONDS: i64 = 253_402_300_799;

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Converts a wire timestamp to a storage timestamp.
///
/// `None` is rejected: a product's `date` must always be supplied by the
/// client.
pub fn to_datetime(ts: Option<&Timestamp>) -> Result<DateTime<Utc>> {
    let ts = ts.ok_or_else(|| Error::InvalidTimestamp {
        reason: "timestamp: nil Timestamp".to_string(),
    })?;

    if ts.seconds < MIN_VALID_SECONDS {
        return Err(Error::InvalidTimestamp {
            reason: format!("timestamp: {ts:?} before 0001-01-01"),
        });
    }
    if ts.seconds > MAX_VALID_SECONDS {
        return Err(Error::InvalidTimestamp {
            reason: format!("timestamp: {ts:?} after 10000-01-01"),
        });
    }
    if !(0..NANOS_PER_SECOND).contains(&ts.nanos) {
        return Err(Error::InvalidTimestamp {
            reason: format!("timestamp: {ts:?}: nanos not in range [0, 1e9)"),
        });
    }

    DateTime::from_timestamp(ts.seconds, ts.nanos as u32).ok_or_else(|| Error::InvalidTimestamp {
        reason: format!("timestamp: {ts:?} is not representable"),
    })
}

/// Converts a storage timestamp back to its wire form.
pub fn from_datetime(dt: &DateTime<Utc>) -> Timestamp {
    // chrono encodes leap seconds as nanos >= 1e9; protobuf has no leap seconds
    let nanos = dt.timestamp_subsec_nanos().min(NANOS_PER_SECOND as u32 - 1);
    Timestamp {
        seconds: dt.timestamp(),
        nanos: nanos as i32,
    }
}
