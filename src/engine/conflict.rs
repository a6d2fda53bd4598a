use crate::limits::*;
use crate::model::*;

use super::EngineError;
use super::buffer::exclusion_zones;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    if span.end <= span.start {
        return Err(EngineError::validation("range", "end must be after start"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::validation("range", "timestamp out of bounds"));
    }
    Ok(())
}

/// Mark candidates that collide with booked sessions, then enforce the
/// between-sessions spacing among the survivors.
///
/// Candidates must be sorted ascending by start (slot generation guarantees
/// this). One cursor walks the merged zone list while another walks the
/// candidates, so the pass is linear after sorting.
///
/// Spacing is a left-to-right acceptance pass: each accepted slot pushes a
/// frontier of `end + between_sessions` that later candidates must clear.
/// Rejected candidates never push the frontier.
pub fn mark_conflicts(slots: &mut [AvailableSlot], busy: &[BusyInterval], buffers: &BufferSettings) {
    let zones = exclusion_zones(busy, buffers);
    let between = buffers.between_sessions * MINUTE;

    let mut zi = 0;
    let mut frontier: Option<Ms> = None;
    for slot in slots.iter_mut() {
        if !slot.available {
            continue;
        }
        while zi < zones.len() && zones[zi].end <= slot.span.start {
            zi += 1;
        }
        if zi < zones.len() && zones[zi].start < slot.span.end {
            slot.reject(ConflictReason::Booked);
            continue;
        }
        if let Some(end) = frontier
            && slot.span.start < end + between {
                slot.reject(ConflictReason::Booked);
                continue;
            }
        frontier = Some(slot.span.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = 3_600_000;

    fn confirmed(start: Ms, end: Ms) -> BusyInterval {
        BusyInterval {
            span: Span::new(start, end),
            status: BusyStatus::Confirmed,
        }
    }

    fn buffers(before: i64, after: i64, between: i64) -> BufferSettings {
        BufferSettings {
            before_session: before,
            after_session: after,
            between_sessions: between,
        }
    }

    fn hour_candidates(from_hour: Ms, count: usize) -> Vec<AvailableSlot> {
        (0..count as Ms)
            .map(|i| AvailableSlot::candidate(Span::new((from_hour + i) * H, (from_hour + i + 1) * H)))
            .collect()
    }

    fn accepted_starts(slots: &[AvailableSlot]) -> Vec<Ms> {
        slots
            .iter()
            .filter(|s| s.available)
            .map(|s| s.span.start)
            .collect()
    }

    #[test]
    fn no_busy_accepts_everything() {
        let mut slots = hour_candidates(9, 3);
        mark_conflicts(&mut slots, &[], &buffers(0, 0, 0));
        assert_eq!(accepted_starts(&slots).len(), 3);
    }

    #[test]
    fn raw_overlap_is_booked() {
        let mut slots = hour_candidates(9, 3);
        mark_conflicts(&mut slots, &[confirmed(10 * H, 11 * H)], &buffers(0, 0, 0));
        assert_eq!(accepted_starts(&slots), vec![9 * H, 11 * H]);
        assert_eq!(slots[1].reason, Some(ConflictReason::Booked));
    }

    #[test]
    fn buffer_zone_swallows_neighbors() {
        // 15-minute buffers around a 10:00–11:00 session exclude every
        // 60-minute candidate between 09:00 and 12:00.
        let mut slots = hour_candidates(9, 3);
        mark_conflicts(&mut slots, &[confirmed(10 * H, 11 * H)], &buffers(15, 15, 0));
        assert!(accepted_starts(&slots).is_empty());
        assert!(slots.iter().all(|s| s.reason == Some(ConflictReason::Booked)));
    }

    #[test]
    fn asymmetric_buffer_uses_larger_side() {
        // before=30, after=0: the gap on *both* sides of the session must
        // still be at least 30 minutes.
        let mut slots = hour_candidates(9, 4); // 09..13
        mark_conflicts(&mut slots, &[confirmed(10 * H, 11 * H)], &buffers(30, 0, 0));
        assert_eq!(accepted_starts(&slots), vec![12 * H]);
    }

    #[test]
    fn between_sessions_spacing() {
        let mut slots = hour_candidates(9, 3);
        mark_conflicts(&mut slots, &[], &buffers(0, 0, 30));
        // 09:00 accepted; 10:00 starts inside the 30-minute frontier; 11:00 clears it.
        assert_eq!(accepted_starts(&slots), vec![9 * H, 11 * H]);
    }

    #[test]
    fn rejected_slots_do_not_push_frontier() {
        let mut slots = hour_candidates(9, 4);
        // 09:00–10:00 collides with a booking; 10:00 must only clear the
        // booking's zone, not a frontier from the rejected 09:00 candidate.
        // 11:00 then falls inside the accepted 10:00 slot's spacing.
        mark_conflicts(&mut slots, &[confirmed(9 * H, 10 * H)], &buffers(0, 0, 30));
        assert_eq!(accepted_starts(&slots), vec![10 * H, 12 * H]);
    }

    #[test]
    fn sweep_handles_many_disjoint_bookings() {
        // Bookings at every even hour knock out exactly the even candidates.
        let busy: Vec<BusyInterval> = (0..12).map(|i| confirmed((2 * i) * H, (2 * i + 1) * H)).collect();
        let mut slots = hour_candidates(0, 24);
        mark_conflicts(&mut slots, &busy, &buffers(0, 0, 0));
        let accepted = accepted_starts(&slots);
        assert_eq!(accepted.len(), 12);
        assert!(accepted.iter().all(|s| (s / H) % 2 == 1));
    }

    #[test]
    fn preview_tiles_pass_through_untouched() {
        let mut slots = vec![
            AvailableSlot::unavailable(Span::new(9 * H, 10 * H), ConflictReason::OverrideBlocked),
            AvailableSlot::candidate(Span::new(10 * H, 11 * H)),
        ];
        mark_conflicts(&mut slots, &[confirmed(9 * H, 11 * H)], &buffers(0, 0, 0));
        assert_eq!(slots[0].reason, Some(ConflictReason::OverrideBlocked));
        assert_eq!(slots[1].reason, Some(ConflictReason::Booked));
    }

    #[test]
    fn validate_span_bounds() {
        assert!(validate_span(&Span { start: 100, end: 100 }).is_err());
        assert!(validate_span(&Span { start: 200, end: 100 }).is_err());
        assert!(validate_span(&Span { start: -5, end: 100 }).is_err());
        assert!(validate_span(&Span::new(100, 200)).is_ok());
    }
}
