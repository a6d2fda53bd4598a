use crate::model::*;

/// Mark slots outside the allowed booking lead-time window.
///
/// A slot is bookable only if
/// `now + last_minute_booking_hours <= slot.start <= now + advance_booking_days`.
/// Failing slots are kept and marked `outside_window` so callers can explain
/// an empty result instead of silently dropping it.
pub fn mark_booking_window(slots: &mut [AvailableSlot], now: Ms, settings: &AvailabilitySettings) {
    let earliest = now + settings.last_minute_booking_hours * HOUR;
    let latest = now + settings.advance_booking_days * DAY;
    for slot in slots.iter_mut() {
        if !slot.available {
            continue;
        }
        if slot.span.start < earliest || slot.span.start > latest {
            slot.reject(ConflictReason::OutsideWindow);
        }
    }
}
