use crate::model::{DAY, MINUTE, Ms};

/// Widest slot-query range a caller may request; wider ranges must page.
pub const MAX_RANGE_DAYS: i64 = 90;
pub const MAX_RANGE_MS: Ms = MAX_RANGE_DAYS * DAY;

pub const MAX_RECURRING_RULES: usize = 64;
pub const MAX_OVERRIDE_WINDOWS: usize = 16;
pub const MAX_ALLOWED_DURATIONS: usize = 16;

/// Buffers are minutes; anything past half a day is a data-entry error.
pub const MAX_BUFFER_MIN: i64 = 12 * 60;
pub const MAX_SESSION_DURATION_MIN: i64 = 8 * 60;

pub const MAX_ADVANCE_BOOKING_DAYS: i64 = 365;
pub const MAX_LAST_MINUTE_HOURS: i64 = 7 * 24;

pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// 2100-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// Busy intervals are fetched with this padding on both sides of the query
/// range so buffer zones reaching across the boundary are visible.
pub const BUSY_FETCH_PAD_MS: Ms = MAX_BUFFER_MIN * MINUTE;
