use crate::model::*;

// ── Exclusion-zone arithmetic ─────────────────────────────────────
//
// Every busy session excludes candidate slots from the surrounding time.
// The gap enforced between a session and any neighbor is the larger of the
// two applicable buffers, so a zone is the busy span widened by
// max(before_session, after_session) on both sides.

/// How far a busy session's exclusion zone reaches past its raw span.
pub fn zone_reach(buffers: &BufferSettings) -> Ms {
    buffers.before_session.max(buffers.after_session) * MINUTE
}

/// Disjoint, sorted exclusion zones for a set of busy sessions.
pub fn exclusion_zones(busy: &[BusyInterval], buffers: &BufferSettings) -> Vec<Span> {
    let reach = zone_reach(buffers);
    let mut zones: Vec<Span> = busy
        .iter()
        .map(|b| Span::new(b.span.start - reach, b.span.end + reach))
        .collect();
    zones.sort_by_key(|z| z.start);
    merge_overlapping(&zones)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

/// Whether `t` falls inside any of the disjoint, sorted `zones`.
pub fn in_zone(zones: &[Span], t: Ms) -> bool {
    let idx = zones.partition_point(|z| z.start <= t);
    idx > 0 && t < zones[idx - 1].end
}
