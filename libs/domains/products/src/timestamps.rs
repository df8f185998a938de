//! Timestamp bookkeeping applied to staged changes at commit time

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::store::{EntryState, StagedChange};

/// Source of the current UTC instant
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock: every reading is one `step` later than the previous one
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step: TimeDelta,
    ticks: AtomicI32,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            start,
            step,
            ticks: AtomicI32::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + self.step * tick
    }
}

/// Stamps creation and modification times on the entities of a commit
///
/// Added entities get `created_at` set to the commit instant (whatever the
/// caller put there is discarded) and `updated_at` cleared. Modified
/// entities get `updated_at` set to the commit instant. Deleted entities are
/// left alone. All entities of one commit share the same instant.
#[derive(Debug, Clone)]
pub struct TimestampInterceptor {
    clock: Arc<dyn Clock>,
}

impl TimestampInterceptor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Stamp every change once, returns how many entities were touched
    pub fn apply(&self, changes: &mut [StagedChange]) -> usize {
        let now = self.clock.now();
        let mut stamped = 0;

        for change in changes.iter_mut() {
            match change.state {
                EntryState::Added => {
                    change.product.created_at = now;
                    change.product.updated_at = None;
                    stamped += 1;
                }
                EntryState::Modified => {
                    change.product.updated_at = Some(now);
                    stamped += 1;
                }
                EntryState::Deleted => {}
            }
        }

        tracing::trace!(stamped, at = %now, "Applied commit timestamps");
        stamped
    }
}

impl Default for TimestampInterceptor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
