use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only absolute time type.
pub type Ms = i64;

pub const SECOND: Ms = 1_000;
pub const MINUTE: Ms = 60 * SECOND;
pub const HOUR: Ms = 60 * MINUTE;
pub const DAY: Ms = 24 * HOUR;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// Wall-clock time of day as minutes since local midnight.
///
/// Parsed from and printed as `"HH:mm"`. `"24:00"` is accepted so a window
/// can end exactly at midnight; windows crossing midnight are not modeled —
/// split them into two single-day entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallTime(u16);

impl WallTime {
    pub fn new(hour: u16, minute: u16) -> Self {
        debug_assert!(hour < 24 || (hour == 24 && minute == 0));
        debug_assert!(minute < 60);
        Self(hour * 60 + minute)
    }

    /// Minutes since local midnight.
    pub fn minutes(&self) -> i64 {
        self.0 as i64
    }
}

impl FromStr for WallTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("expected \"HH:mm\", got {s:?}");
        let (h, m) = s.split_once(':').ok_or_else(bad)?;
        let hour: u16 = h.parse().map_err(|_| bad())?;
        let minute: u16 = m.parse().map_err(|_| bad())?;
        if m.len() != 2 || minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(bad());
        }
        Ok(Self(hour * 60 + minute))
    }
}

impl TryFrom<String> for WallTime {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WallTime> for String {
    fn from(t: WallTime) -> String {
        t.to_string()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// A single-day wall-clock window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    #[serde(rename = "startTime")]
    pub start: WallTime,
    #[serde(rename = "endTime")]
    pub end: WallTime,
}

/// A weekly-repeating bookable window tied to a day of week (0 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRule {
    pub day_of_week: u8,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    Vacation,
    Sick,
    Personal,
    Training,
    Other,
}

/// A one-off exception for a specific calendar date: either a full block or
/// custom hours that replace the recurring windows for that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOverride {
    pub date: NaiveDate,
    pub is_available: bool,
    pub reason: OverrideReason,
    /// Custom windows; non-empty exactly when `is_available`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_slots: Vec<Window>,
}

/// Idle time in minutes enforced around booked sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSettings {
    pub before_session: i64,
    pub after_session: i64,
    pub between_sessions: i64,
}

/// How new bookings are accepted. `Manual` keeps bookings pending until the
/// coach approves them, so pending sessions block availability too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    Auto,
    Manual,
}

/// The mutable settings block of a coach profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySettings {
    pub timezone: Tz,
    pub buffers: BufferSettings,
    /// Minutes; must be a member of `allowed_durations`.
    pub default_duration: i64,
    pub allowed_durations: Vec<i64>,
    pub advance_booking_days: i64,
    pub last_minute_booking_hours: i64,
    pub approval_mode: ApprovalMode,
}

/// Aggregate root: everything needed to compute a coach's bookable time.
///
/// `overrides` is kept sorted by date with at most one entry per date.
/// `version` backs optimistic concurrency: every successful write bumps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachProfile {
    pub coach_id: Ulid,
    pub recurring: Vec<RecurringRule>,
    pub overrides: Vec<DateOverride>,
    pub settings: AvailabilitySettings,
    pub version: u64,
    pub updated_at: Ms,
}

impl CoachProfile {
    /// Profile seeded on first access: Mon–Fri 09:00–17:00, 60-minute
    /// sessions, UTC until the coach picks a timezone.
    pub fn seed_default(coach_id: Ulid) -> Self {
        let recurring = (1..=5)
            .map(|day| RecurringRule {
                day_of_week: day,
                start_time: WallTime::new(9, 0),
                end_time: WallTime::new(17, 0),
                is_active: true,
            })
            .collect();
        Self {
            coach_id,
            recurring,
            overrides: Vec::new(),
            settings: AvailabilitySettings {
                timezone: Tz::UTC,
                buffers: BufferSettings::default(),
                default_duration: 60,
                allowed_durations: vec![60],
                advance_booking_days: 30,
                last_minute_booking_hours: 0,
                approval_mode: ApprovalMode::Auto,
            },
            version: 0,
            updated_at: 0,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    /// The override for `date`, if one exists. Relies on `overrides` being
    /// sorted by date.
    pub fn override_for(&self, date: NaiveDate) -> Option<&DateOverride> {
        self.overrides
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| &self.overrides[i])
    }

    /// Active recurring windows for a weekday (0 = Sunday).
    pub fn recurring_windows(&self, weekday: u8) -> Vec<Window> {
        self.recurring
            .iter()
            .filter(|r| r.is_active && r.day_of_week == weekday)
            .map(|r| Window {
                start: r.start_time,
                end: r.end_time,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyStatus {
    Confirmed,
    Pending,
}

/// A booked (or pending) session — read-only input, never mutated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub span: Span,
    pub status: BusyStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    Booked,
    OutsideWindow,
    OverrideBlocked,
}

/// A candidate bookable interval. Produced fresh per request, owned by the
/// caller, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableSlot {
    pub span: Span,
    pub available: bool,
    pub reason: Option<ConflictReason>,
}

impl AvailableSlot {
    pub fn candidate(span: Span) -> Self {
        Self {
            span,
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(span: Span, reason: ConflictReason) -> Self {
        Self {
            span,
            available: false,
            reason: Some(reason),
        }
    }

    /// Mark the slot unavailable. The first rejection wins; later stages
    /// never overwrite an earlier reason.
    pub fn reject(&mut self, reason: ConflictReason) {
        if self.available {
            self.available = false;
            self.reason = Some(reason);
        }
    }
}

/// Live status derived from the same primitives as slot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityStatus {
    pub currently_available: bool,
    /// Raw end of the session whose buffer zone covers "now", if any.
    pub current_session_end: Option<Ms>,
    /// Earliest bookable slot start strictly after "now"; `None` when the
    /// whole advance-booking horizon is full (not an error).
    pub next_available_slot: Option<Ms>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn walltime_parses_and_prints() {
        let t: WallTime = "09:30".parse().unwrap();
        assert_eq!(t.minutes(), 9 * 60 + 30);
        assert_eq!(t.to_string(), "09:30");

        let single_digit_hour: WallTime = "9:05".parse().unwrap();
        assert_eq!(single_digit_hour, WallTime::new(9, 5));

        let midnight_end: WallTime = "24:00".parse().unwrap();
        assert_eq!(midnight_end.minutes(), 1440);
    }

    #[test]
    fn walltime_rejects_malformed() {
        for bad in ["", "0900", "25:00", "09:60", "24:01", "09:5", "aa:bb", "09:00:00"] {
            assert!(bad.parse::<WallTime>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn walltime_serde_as_string() {
        let t: WallTime = serde_json::from_str("\"17:00\"").unwrap();
        assert_eq!(t, WallTime::new(17, 0));
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"17:00\"");
        assert!(serde_json::from_str::<WallTime>("\"17h00\"").is_err());
    }

    #[test]
    fn recurring_rule_wire_names() {
        let rule = RecurringRule {
            day_of_week: 1,
            start_time: WallTime::new(9, 0),
            end_time: WallTime::new(17, 0),
            is_active: true,
        };
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dayOfWeek": 1,
                "startTime": "09:00",
                "endTime": "17:00",
                "isActive": true,
            })
        );
    }

    #[test]
    fn override_wire_shape() {
        let json = serde_json::json!({
            "date": "2026-08-10",
            "isAvailable": false,
            "reason": "vacation",
        });
        let parsed: DateOverride = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.reason, OverrideReason::Vacation);
        assert!(parsed.time_slots.is_empty());
    }

    #[test]
    fn override_lookup_is_sorted() {
        let mut profile = CoachProfile::seed_default(Ulid::new());
        let date = |d: u32| NaiveDate::from_ymd_opt(2026, 8, d).unwrap();
        for d in [10, 12, 20] {
            profile.overrides.push(DateOverride {
                date: date(d),
                is_available: false,
                reason: OverrideReason::Personal,
                time_slots: Vec::new(),
            });
        }
        assert!(profile.override_for(date(12)).is_some());
        assert!(profile.override_for(date(11)).is_none());
    }

    #[test]
    fn seeded_profile_shape() {
        let profile = CoachProfile::seed_default(Ulid::new());
        assert_eq!(profile.recurring.len(), 5);
        assert!(profile.recurring.iter().all(|r| r.is_active));
        assert!(profile.recurring.iter().all(|r| (1..=5).contains(&r.day_of_week)));
        assert_eq!(profile.settings.default_duration, 60);
        assert!(profile.settings.allowed_durations.contains(&60));
        // Saturday and Sunday closed by default
        assert!(profile.recurring_windows(0).is_empty());
        assert!(profile.recurring_windows(6).is_empty());
        assert_eq!(profile.recurring_windows(3).len(), 1);
    }

    #[test]
    fn reject_keeps_first_reason() {
        let mut slot = AvailableSlot::candidate(Span::new(0, 100));
        slot.reject(ConflictReason::Booked);
        slot.reject(ConflictReason::OutsideWindow);
        assert!(!slot.available);
        assert_eq!(slot.reason, Some(ConflictReason::Booked));
    }
}
