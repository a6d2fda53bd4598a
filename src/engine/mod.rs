mod buffer;
mod conflict;
mod error;
mod mutations;
mod queries;
mod slots;
mod status;
mod store;
mod window;

pub use buffer::{exclusion_zones, in_zone, merge_overlapping, zone_reach};
pub use conflict::mark_conflicts;
pub use error::EngineError;
pub use slots::{GenerateMode, generate};
pub use status::compute_status;
pub use store::{
    InMemoryProfileStore, InMemorySessionStore, ProfileStore, SessionStore, SharedProfile,
};
pub use window::mark_booking_window;

use std::sync::Arc;

/// The availability engine: pure interval arithmetic over snapshots fetched
/// from dependency-injected stores. Holds no state of its own, so one
/// instance serves any number of coaches and concurrent requests.
pub struct Engine {
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn SessionStore>,
}

impl Engine {
    pub fn new(profiles: Arc<dyn ProfileStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { profiles, sessions }
    }
}
