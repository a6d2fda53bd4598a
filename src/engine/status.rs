use crate::model::*;

use super::EngineError;
use super::buffer::{exclusion_zones, in_zone, zone_reach};
use super::slots::{GenerateMode, generate};
use super::{conflict, window};

/// Derive live status from the same primitives as slot generation.
///
/// "Available right now" means `now` falls inside a candidate slot for
/// today and outside every busy session's buffer zone. The next bookable
/// slot is searched across the whole advance-booking horizon; `None` means
/// the horizon is fully booked, which is a valid answer, not an error.
pub fn compute_status(
    profile: &CoachProfile,
    busy: &[BusyInterval],
    now: Ms,
) -> Result<AvailabilityStatus, EngineError> {
    let duration = profile.settings.default_duration;

    // A slot containing `now` always belongs to now's local day, so a
    // day-wide probe around `now` is enough.
    let probe = generate(
        profile,
        &Span::new(now - DAY, now + DAY),
        duration,
        GenerateMode::Bookable,
        None,
    )?;
    let zones = exclusion_zones(busy, &profile.settings.buffers);
    let in_candidate = probe.iter().any(|s| s.span.contains_instant(now));
    let currently_available = in_candidate && !in_zone(&zones, now);

    let reach = zone_reach(&profile.settings.buffers);
    let current_session_end = busy
        .iter()
        .filter(|b| b.span.start - reach <= now && now < b.span.end + reach)
        .map(|b| b.span.end)
        .max();

    let horizon = Span::new(now, now + (profile.settings.advance_booking_days + 1) * DAY);
    let mut future = generate(profile, &horizon, duration, GenerateMode::Bookable, None)?;
    conflict::mark_conflicts(&mut future, busy, &profile.settings.buffers);
    window::mark_booking_window(&mut future, now, &profile.settings);
    let next_available_slot = future
        .iter()
        .filter(|s| s.available && s.span.start > now)
        .map(|s| s.span.start)
        .min();

    Ok(AvailabilityStatus {
        currently_available,
        current_session_end,
        next_available_slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn utc_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Ms {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn wall(s: &str) -> WallTime {
        s.parse().unwrap()
    }

    // Mondays 09:00–17:00 in Asia/Jerusalem (06:00Z–14:00Z in August).
    fn monday_profile() -> CoachProfile {
        let mut profile = CoachProfile::seed_default(Ulid::new());
        profile.settings.timezone = chrono_tz::Asia::Jerusalem;
        profile.recurring = vec![RecurringRule {
            day_of_week: 1,
            start_time: wall("09:00"),
            end_time: wall("17:00"),
            is_active: true,
        }];
        profile
    }

    fn confirmed(start: Ms, end: Ms) -> BusyInterval {
        BusyInterval {
            span: Span::new(start, end),
            status: BusyStatus::Confirmed,
        }
    }

    #[test]
    fn free_inside_a_slot() {
        // Monday 2026-08-10, 09:30 local.
        let now = utc_ms(2026, 8, 10, 6, 30);
        let status = compute_status(&monday_profile(), &[], now).unwrap();
        assert!(status.currently_available);
        assert_eq!(status.current_session_end, None);
        // Next bookable slot starts at 10:00 local.
        assert_eq!(status.next_available_slot, Some(utc_ms(2026, 8, 10, 7, 0)));
    }

    #[test]
    fn outside_working_hours() {
        // Monday 05:00 local — before the first window.
        let now = utc_ms(2026, 8, 10, 2, 0);
        let status = compute_status(&monday_profile(), &[], now).unwrap();
        assert!(!status.currently_available);
        assert_eq!(status.next_available_slot, Some(utc_ms(2026, 8, 10, 6, 0)));
    }

    #[test]
    fn during_a_session() {
        let busy = [confirmed(utc_ms(2026, 8, 10, 6, 0), utc_ms(2026, 8, 10, 7, 0))];
        let now = utc_ms(2026, 8, 10, 6, 30);
        let status = compute_status(&monday_profile(), &busy, now).unwrap();
        assert!(!status.currently_available);
        assert_eq!(status.current_session_end, Some(utc_ms(2026, 8, 10, 7, 0)));
        assert_eq!(status.next_available_slot, Some(utc_ms(2026, 8, 10, 7, 0)));
    }

    #[test]
    fn inside_trailing_buffer_reports_session_end() {
        let mut profile = monday_profile();
        profile.settings.buffers.after_session = 30;
        let busy = [confirmed(utc_ms(2026, 8, 10, 6, 0), utc_ms(2026, 8, 10, 7, 0))];
        // 10:10 local: the session is over but its buffer still covers now.
        let now = utc_ms(2026, 8, 10, 7, 10);
        let status = compute_status(&profile, &busy, now).unwrap();
        assert!(!status.currently_available);
        assert_eq!(status.current_session_end, Some(utc_ms(2026, 8, 10, 7, 0)));
    }

    #[test]
    fn next_slot_scans_to_following_week() {
        // Saturday: nothing today, next Monday 09:00 local is the answer.
        let now = utc_ms(2026, 8, 8, 12, 0);
        let status = compute_status(&monday_profile(), &[], now).unwrap();
        assert!(!status.currently_available);
        assert_eq!(status.next_available_slot, Some(utc_ms(2026, 8, 10, 6, 0)));
    }

    #[test]
    fn empty_schedule_has_no_next_slot() {
        let mut profile = monday_profile();
        profile.recurring.clear();
        let now = utc_ms(2026, 8, 10, 6, 30);
        let status = compute_status(&profile, &[], now).unwrap();
        assert!(!status.currently_available);
        assert_eq!(status.next_available_slot, None);
    }

    #[test]
    fn fully_booked_horizon_has_no_next_slot() {
        let mut profile = monday_profile();
        profile.settings.advance_booking_days = 7;
        // Block the only Monday in the horizon.
        let busy = [confirmed(utc_ms(2026, 8, 10, 6, 0), utc_ms(2026, 8, 10, 14, 0))];
        let now = utc_ms(2026, 8, 9, 12, 0);
        let status = compute_status(&profile, &busy, now).unwrap();
        assert_eq!(status.next_available_slot, None);
    }

    #[test]
    fn last_minute_cutoff_pushes_next_slot() {
        let mut profile = monday_profile();
        profile.settings.last_minute_booking_hours = 2;
        // 08:30 local Monday: 09:00 is inside the 2-hour cutoff.
        let now = utc_ms(2026, 8, 10, 5, 30);
        let status = compute_status(&profile, &[], now).unwrap();
        assert_eq!(status.next_available_slot, Some(utc_ms(2026, 8, 10, 8, 0)));
    }
}
