use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use crate::model::*;

use super::EngineError;
use super::conflict::validate_span;

/// What to emit for dates blocked by an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateMode {
    /// Blocked dates emit nothing.
    Bookable,
    /// Blocked dates still tile their suppressed recurring windows, marked
    /// `override_blocked`, so callers can explain why a day is empty.
    Preview,
}

/// Tile a coach's availability into candidate slots of `duration_min`
/// minutes over `[range.start, range.end)`.
///
/// Per local calendar day: a blocking override wins, an available override
/// replaces (never merges with) the recurring windows, otherwise the active
/// recurring windows for that weekday apply. Windows are tiled in wall-clock
/// space and each endpoint is resolved to an instant with the offset in
/// effect on that date — never an offset cached from another date. A
/// trailing remainder shorter than the duration is dropped.
///
/// Output is sorted ascending by start and clipped to `range`. The
/// cancellation token is checked once per day; a cancelled generation
/// returns an error rather than partial output.
pub fn generate(
    profile: &CoachProfile,
    range: &Span,
    duration_min: i64,
    mode: GenerateMode,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<AvailableSlot>, EngineError> {
    validate_span(range)?;
    if duration_min <= 0 {
        return Err(EngineError::validation("duration", "must be positive"));
    }
    if !profile.settings.allowed_durations.contains(&duration_min) {
        return Err(EngineError::validation(
            "duration",
            format!("{duration_min} minutes is not an allowed session duration"),
        ));
    }

    let tz = profile.timezone();
    let mut slots = Vec::new();
    for date in local_days(range, &tz) {
        if let Some(token) = cancel
            && token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
        match profile.override_for(date) {
            Some(o) if !o.is_available => {
                if mode == GenerateMode::Preview {
                    let weekday = date.weekday().num_days_from_sunday() as u8;
                    for window in profile.recurring_windows(weekday) {
                        tile_window(
                            &mut slots,
                            date,
                            window,
                            duration_min,
                            &tz,
                            range,
                            Some(ConflictReason::OverrideBlocked),
                        );
                    }
                }
            }
            Some(o) => {
                for &window in &o.time_slots {
                    tile_window(&mut slots, date, window, duration_min, &tz, range, None);
                }
            }
            None => {
                let weekday = date.weekday().num_days_from_sunday() as u8;
                for window in profile.recurring_windows(weekday) {
                    tile_window(&mut slots, date, window, duration_min, &tz, range, None);
                }
            }
        }
    }

    slots.sort_by_key(|s| s.span.start);
    Ok(slots)
}

/// Local calendar days touched by `range` in `tz`, in order.
fn local_days(range: &Span, tz: &Tz) -> Vec<NaiveDate> {
    let first = to_local_date(range.start, tz);
    let last = to_local_date(range.end - 1, tz);
    first.iter_days().take_while(|d| *d <= last).collect()
}

fn to_local_date(ms: Ms, tz: &Tz) -> NaiveDate {
    DateTime::from_timestamp_millis(ms)
        .expect("timestamp validated against limits")
        .with_timezone(tz)
        .date_naive()
}

/// Tile one wall-clock window on one date into consecutive slots, resolving
/// each endpoint to an instant. Slots touching a spring-forward gap are
/// skipped; ambiguous fall-back times resolve to the earlier instant.
fn tile_window(
    out: &mut Vec<AvailableSlot>,
    date: NaiveDate,
    window: Window,
    duration_min: i64,
    tz: &Tz,
    range: &Span,
    mark: Option<ConflictReason>,
) {
    let mut t = window.start.minutes();
    let end = window.end.minutes();
    while t + duration_min <= end {
        if let (Some(start), Some(stop)) = (
            resolve_local(date, t, tz),
            resolve_local(date, t + duration_min, tz),
        ) {
            let span = Span::new(start, stop);
            if span.start >= range.start && span.end <= range.end {
                out.push(match mark {
                    None => AvailableSlot::candidate(span),
                    Some(reason) => AvailableSlot::unavailable(span, reason),
                });
            }
        }
        t += duration_min;
    }
}

/// Resolve a wall-clock minute-of-day on a date to an instant, using the
/// offset in effect at that exact local time. Minute 1440 means midnight of
/// the following day.
fn resolve_local(date: NaiveDate, minutes: i64, tz: &Tz) -> Option<Ms> {
    let (date, minutes) = if minutes >= 1440 {
        (date.succ_opt()?, minutes - 1440)
    } else {
        (date, minutes)
    };
    let time = NaiveTime::from_hms_opt(minutes as u32 / 60, minutes as u32 % 60, 0)
        .expect("minute-of-day below 1440");
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Some(dt.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => None,
    }
}
