// Task id assignment.
// Ids are milliseconds since the Unix epoch taken at creation time.
use chrono::Utc;

use crate::app::models::{Task, TaskId};

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> TaskId;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> TaskId {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IdPolicy {
    // Raw creation timestamp. Two tasks created in the same millisecond share an id.
    Timestamp,
    // Creation timestamp, bumped above the highest id already in the list.
    Monotonic,
}

impl IdPolicy {
    // None when no id above the highest stored one is left
    pub fn assign(&self, now_millis: TaskId, existing: &[Task]) -> Option<TaskId> {
        match self {
            IdPolicy::Timestamp => Some(now_millis),
            IdPolicy::Monotonic => match existing.iter().map(|task| task.id).max() {
                Some(highest) if highest >= now_millis => highest.checked_add(1),
                _ => Some(now_millis),
            },
        }
    }
}

#[cfg(test)]
pub struct FixedClock(pub std::sync::atomic::AtomicI64);

#[cfg(test)]
impl FixedClock {
    pub fn at(millis: TaskId) -> FixedClock {
        FixedClock(std::sync::atomic::AtomicI64::new(millis))
    }

    pub fn advance(&self, millis: TaskId) {
        self.0
            .fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now_millis(&self) -> TaskId {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
