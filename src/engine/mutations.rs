use chrono::NaiveDate;
use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// Read the profile, seeding the default (Mon–Fri 09:00–17:00, 60-minute
    /// sessions) on first access. A concurrent first access may win the
    /// seeding race; the loser re-reads and returns the winner's profile.
    pub async fn profile_or_default(&self, coach_id: Ulid) -> Result<CoachProfile, EngineError> {
        if let Some(profile) = self.profiles.get(coach_id).await? {
            return Ok(profile);
        }
        match self.profiles.put(CoachProfile::seed_default(coach_id), 0).await {
            Ok(profile) => {
                info!(%coach_id, "seeded default availability profile");
                Ok(profile)
            }
            Err(EngineError::VersionConflict { .. }) => self
                .profiles
                .get(coach_id)
                .await?
                .ok_or(EngineError::NotFound(coach_id)),
            Err(e) => Err(e),
        }
    }

    /// Replace the whole recurring set in one atomic write.
    pub async fn replace_recurring(
        &self,
        coach_id: Ulid,
        rules: Vec<RecurringRule>,
        expected_version: u64,
    ) -> Result<CoachProfile, EngineError> {
        validate_recurring(&rules)?;
        let mut profile = self.profile_or_default(coach_id).await?;
        profile.recurring = rules;
        let result = self.profiles.put(profile, expected_version).await;
        record_write(&result);
        if result.is_ok() {
            info!(%coach_id, "replaced recurring schedule");
        }
        result
    }

    /// Replace the settings block in one atomic write.
    pub async fn update_settings(
        &self,
        coach_id: Ulid,
        settings: AvailabilitySettings,
        expected_version: u64,
    ) -> Result<CoachProfile, EngineError> {
        validate_settings(&settings)?;
        let mut profile = self.profile_or_default(coach_id).await?;
        profile.settings = settings;
        let result = self.profiles.put(profile, expected_version).await;
        record_write(&result);
        if result.is_ok() {
            info!(%coach_id, "updated availability settings");
        }
        result
    }

    /// Add (or overwrite — last write wins) the override for one date.
    pub async fn add_override(
        &self,
        coach_id: Ulid,
        entry: DateOverride,
    ) -> Result<CoachProfile, EngineError> {
        validate_override(&entry)?;
        self.profile_or_default(coach_id).await?;
        let result = self.profiles.add_override(coach_id, entry).await;
        record_write(&result);
        result
    }

    /// Remove the override for one date; a date without one is a no-op.
    pub async fn remove_override(
        &self,
        coach_id: Ulid,
        date: NaiveDate,
    ) -> Result<CoachProfile, EngineError> {
        self.profile_or_default(coach_id).await?;
        let result = self.profiles.remove_override(coach_id, date).await;
        record_write(&result);
        result
    }
}

fn record_write(result: &Result<CoachProfile, EngineError>) {
    match result {
        Ok(_) => metrics::counter!(crate::observability::PROFILE_WRITES_TOTAL).increment(1),
        Err(EngineError::VersionConflict { .. }) => {
            metrics::counter!(crate::observability::VERSION_CONFLICTS_TOTAL).increment(1);
        }
        Err(_) => {}
    }
}

// ── Write-time validation ────────────────────────────────────────
//
// Bad input is rejected with the offending field named, never silently
// corrected.

pub(super) fn validate_recurring(rules: &[RecurringRule]) -> Result<(), EngineError> {
    if rules.len() > MAX_RECURRING_RULES {
        return Err(EngineError::validation("recurring", "too many rules"));
    }
    for rule in rules {
        if rule.day_of_week > 6 {
            return Err(EngineError::validation(
                "dayOfWeek",
                format!("{} is not a weekday index (0–6)", rule.day_of_week),
            ));
        }
        if rule.end_time <= rule.start_time {
            return Err(EngineError::validation(
                "endTime",
                format!("{} is not after {}", rule.end_time, rule.start_time),
            ));
        }
    }
    // Active windows on the same weekday must not overlap; overlaps would
    // tile duplicate candidates.
    for day in 0..7u8 {
        let mut windows: Vec<(WallTime, WallTime)> = rules
            .iter()
            .filter(|r| r.is_active && r.day_of_week == day)
            .map(|r| (r.start_time, r.end_time))
            .collect();
        windows.sort();
        for pair in windows.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(EngineError::validation(
                    "recurring",
                    format!("overlapping active windows on weekday {day}"),
                ));
            }
        }
    }
    Ok(())
}

pub(super) fn validate_override(entry: &DateOverride) -> Result<(), EngineError> {
    if entry.is_available {
        if entry.time_slots.is_empty() {
            return Err(EngineError::validation(
                "timeSlots",
                "an available override needs at least one window",
            ));
        }
        if entry.time_slots.len() > MAX_OVERRIDE_WINDOWS {
            return Err(EngineError::validation("timeSlots", "too many windows"));
        }
        for window in &entry.time_slots {
            if window.end <= window.start {
                return Err(EngineError::validation(
                    "timeSlots",
                    format!("{} is not after {}", window.end, window.start),
                ));
            }
        }
        let mut sorted: Vec<(WallTime, WallTime)> =
            entry.time_slots.iter().map(|w| (w.start, w.end)).collect();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(EngineError::validation(
                    "timeSlots",
                    "override windows overlap",
                ));
            }
        }
    } else if !entry.time_slots.is_empty() {
        return Err(EngineError::validation(
            "timeSlots",
            "a blocked override cannot carry windows",
        ));
    }
    Ok(())
}

pub(super) fn validate_settings(settings: &AvailabilitySettings) -> Result<(), EngineError> {
    let buffers = &settings.buffers;
    for (field, value) in [
        ("beforeSession", buffers.before_session),
        ("afterSession", buffers.after_session),
        ("betweenSessions", buffers.between_sessions),
    ] {
        if !(0..=MAX_BUFFER_MIN).contains(&value) {
            return Err(EngineError::validation(
                field,
                format!("{value} minutes is outside 0–{MAX_BUFFER_MIN}"),
            ));
        }
    }
    if settings.allowed_durations.is_empty() {
        return Err(EngineError::validation(
            "allowedDurations",
            "at least one duration is required",
        ));
    }
    if settings.allowed_durations.len() > MAX_ALLOWED_DURATIONS {
        return Err(EngineError::validation("allowedDurations", "too many durations"));
    }
    for &duration in &settings.allowed_durations {
        if !(1..=MAX_SESSION_DURATION_MIN).contains(&duration) {
            return Err(EngineError::validation(
                "allowedDurations",
                format!("{duration} minutes is outside 1–{MAX_SESSION_DURATION_MIN}"),
            ));
        }
    }
    if !settings.allowed_durations.contains(&settings.default_duration) {
        return Err(EngineError::validation(
            "defaultDuration",
            format!("{} minutes is not in allowedDurations", settings.default_duration),
        ));
    }
    if !(1..=MAX_ADVANCE_BOOKING_DAYS).contains(&settings.advance_booking_days) {
        return Err(EngineError::validation(
            "advanceBookingDays",
            format!("must be between 1 and {MAX_ADVANCE_BOOKING_DAYS}"),
        ));
    }
    if !(0..=MAX_LAST_MINUTE_HOURS).contains(&settings.last_minute_booking_hours) {
        return Err(EngineError::validation(
            "lastMinuteBookingHours",
            format!("must be between 0 and {MAX_LAST_MINUTE_HOURS}"),
        ));
    }
    Ok(())
}
