//! Timestamp helpers shared by backends without a native FILETIME clock

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 100 ns intervals between 1601-01-01 and 1970-01-01
pub const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// Converts a duration since the Unix epoch into FILETIME ticks
pub fn unix_to_file_time(since_epoch: Duration) -> u64 {
    let ticks = since_epoch.as_nanos() / 100;
    FILETIME_UNIX_EPOCH.saturating_add(u64::try_from(ticks).unwrap_or(u64::MAX))
}

/// Current wall-clock time as FILETIME ticks
pub fn system_file_time() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    unix_to_file_time(since_epoch)
}

/// Truncates a millisecond count to the wrapping 32-bit tick counter
pub fn wrap_ticks(millis: u128) -> u32 {
    (millis & u32::MAX as u128) as u32
}
