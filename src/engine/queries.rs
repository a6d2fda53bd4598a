use futures::try_join;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::validate_span;
use super::slots::GenerateMode;
use super::{Engine, EngineError, conflict, slots, status, window};

impl Engine {
    /// The full read pipeline: fetch the profile and busy sessions
    /// (concurrently — they are independent reads), generate candidates,
    /// mark booking conflicts, then mark the booking window against `now`.
    ///
    /// Every candidate is returned, marked; callers filter on `available`.
    /// A fetch failure aborts the whole computation — slots are never
    /// derived from partial data.
    pub async fn available_slots(
        &self,
        coach_id: Ulid,
        range: Span,
        duration_min: Option<i64>,
        mode: GenerateMode,
        now: Ms,
        cancel: &CancellationToken,
    ) -> Result<Vec<AvailableSlot>, EngineError> {
        let started = std::time::Instant::now();
        validate_span(&range)?;
        if range.duration_ms() > MAX_RANGE_MS {
            return Err(EngineError::RangeTooLarge {
                days: range.duration_ms() / DAY,
                cap: MAX_RANGE_DAYS,
            });
        }

        // Busy sessions just outside the range can still exclude slots
        // inside it through their buffer zones, so fetch with padding.
        let fetch_range = Span::new(range.start - BUSY_FETCH_PAD_MS, range.end + BUSY_FETCH_PAD_MS);
        let (profile, busy) = try_join!(
            self.profile_or_default(coach_id),
            self.sessions.list_busy(coach_id, fetch_range),
        )?;
        let busy = relevant_busy(busy, profile.settings.approval_mode);

        let duration = duration_min.unwrap_or(profile.settings.default_duration);
        let mut slots = slots::generate(&profile, &range, duration, mode, Some(cancel))?;
        conflict::mark_conflicts(&mut slots, &busy, &profile.settings.buffers);
        window::mark_booking_window(&mut slots, now, &profile.settings);

        metrics::counter!(crate::observability::SLOT_QUERIES_TOTAL).increment(1);
        metrics::histogram!(crate::observability::SLOT_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::histogram!(crate::observability::SLOTS_RETURNED).record(slots.len() as f64);
        Ok(slots)
    }

    /// Live status: available right now, end of the session blocking "now",
    /// and the next bookable slot within the advance-booking horizon.
    pub async fn status(&self, coach_id: Ulid, now: Ms) -> Result<AvailabilityStatus, EngineError> {
        let profile = self.profile_or_default(coach_id).await?;
        let horizon = Span::new(
            now - DAY - BUSY_FETCH_PAD_MS,
            now + (profile.settings.advance_booking_days + 1) * DAY + BUSY_FETCH_PAD_MS,
        );
        let busy = self.sessions.list_busy(coach_id, horizon).await?;
        let busy = relevant_busy(busy, profile.settings.approval_mode);
        metrics::counter!(crate::observability::STATUS_PROBES_TOTAL).increment(1);
        status::compute_status(&profile, &busy, now)
    }
}

/// Pending sessions block availability only under manual approval.
fn relevant_busy(mut busy: Vec<BusyInterval>, approval: ApprovalMode) -> Vec<BusyInterval> {
    if approval == ApprovalMode::Auto {
        busy.retain(|b| b.status == BusyStatus::Confirmed);
    }
    busy
}
