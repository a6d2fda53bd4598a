use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;
use super::conflict::now_ms;

pub type SharedProfile = Arc<RwLock<CoachProfile>>;

/// Durable home of coach availability profiles.
///
/// All writes are atomic and guarded by optimistic concurrency:
/// `expected_version` is the version the writer read (0 to create). On a
/// mismatch the store returns `VersionConflict` and the writer must re-read.
/// Readers never observe a partially-applied write.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, coach_id: Ulid) -> Result<Option<CoachProfile>, EngineError>;

    /// Replace the whole profile. The stored copy gets
    /// `version = expected_version + 1` and a fresh `updated_at`.
    async fn put(
        &self,
        profile: CoachProfile,
        expected_version: u64,
    ) -> Result<CoachProfile, EngineError>;

    /// Insert or replace the override for `entry.date` (last write wins).
    async fn add_override(
        &self,
        coach_id: Ulid,
        entry: DateOverride,
    ) -> Result<CoachProfile, EngineError>;

    /// Remove the override for `date`. Removing a date that has no override
    /// is a no-op.
    async fn remove_override(
        &self,
        coach_id: Ulid,
        date: NaiveDate,
    ) -> Result<CoachProfile, EngineError>;
}

/// Source of booked sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Busy intervals overlapping `range`, sorted by start. Returns
    /// confirmed and pending sessions; cancelled ones never appear. Whether
    /// pending sessions block availability is the caller's decision.
    async fn list_busy(&self, coach_id: Ulid, range: Span) -> Result<Vec<BusyInterval>, EngineError>;
}

// ── In-memory reference implementations ──────────────────────────

/// Profile store backed by a concurrent map; the reference implementation
/// for the server binary and for tests.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<Ulid, SharedProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shared(&self, coach_id: Ulid) -> Result<SharedProfile, EngineError> {
        self.profiles
            .get(&coach_id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(coach_id))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, coach_id: Ulid) -> Result<Option<CoachProfile>, EngineError> {
        let shared = match self.profiles.get(&coach_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        let guard = shared.read().await;
        Ok(Some(guard.clone()))
    }

    async fn put(
        &self,
        mut profile: CoachProfile,
        expected_version: u64,
    ) -> Result<CoachProfile, EngineError> {
        if expected_version == 0 {
            // Creation path. The entry API makes concurrent first writes
            // race safely: exactly one wins, the rest see a conflict.
            use dashmap::mapref::entry::Entry;
            match self.profiles.entry(profile.coach_id) {
                Entry::Occupied(entry) => {
                    let existing = entry.get().clone();
                    drop(entry);
                    let found = existing.read().await.version;
                    Err(EngineError::VersionConflict {
                        coach_id: profile.coach_id,
                        expected: 0,
                        found,
                    })
                }
                Entry::Vacant(slot) => {
                    profile.version = 1;
                    profile.updated_at = now_ms();
                    slot.insert(Arc::new(RwLock::new(profile.clone())));
                    Ok(profile)
                }
            }
        } else {
            let shared = self.shared(profile.coach_id)?;
            let mut guard = shared.write().await;
            if guard.version != expected_version {
                return Err(EngineError::VersionConflict {
                    coach_id: profile.coach_id,
                    expected: expected_version,
                    found: guard.version,
                });
            }
            profile.version = expected_version + 1;
            profile.updated_at = now_ms();
            *guard = profile.clone();
            Ok(profile)
        }
    }

    async fn add_override(
        &self,
        coach_id: Ulid,
        entry: DateOverride,
    ) -> Result<CoachProfile, EngineError> {
        let shared = self.shared(coach_id)?;
        let mut guard = shared.write().await;
        match guard.overrides.binary_search_by_key(&entry.date, |o| o.date) {
            Ok(i) => guard.overrides[i] = entry,
            Err(i) => guard.overrides.insert(i, entry),
        }
        guard.version += 1;
        guard.updated_at = now_ms();
        Ok(guard.clone())
    }

    async fn remove_override(
        &self,
        coach_id: Ulid,
        date: NaiveDate,
    ) -> Result<CoachProfile, EngineError> {
        let shared = self.shared(coach_id)?;
        let mut guard = shared.write().await;
        if let Ok(i) = guard.overrides.binary_search_by_key(&date, |o| o.date) {
            guard.overrides.remove(i);
            guard.version += 1;
            guard.updated_at = now_ms();
        }
        Ok(guard.clone())
    }
}

/// Session store backed by a concurrent map; tests and the demo binary
/// insert busy intervals directly.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<Ulid, Vec<BusyInterval>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session, keeping the per-coach list sorted by start.
    pub fn insert(&self, coach_id: Ulid, interval: BusyInterval) {
        let mut entry = self.sessions.entry(coach_id).or_default();
        let pos = entry
            .binary_search_by_key(&interval.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        entry.insert(pos, interval);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn list_busy(&self, coach_id: Ulid, range: Span) -> Result<Vec<BusyInterval>, EngineError> {
        Ok(self
            .sessions
            .get(&coach_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|b| b.span.overlaps(&range))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
