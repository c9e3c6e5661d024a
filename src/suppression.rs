// src/suppression.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::voice::MemberId;

/// Time source for the tracker. Always UTC so DST shifts never matter.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Hand-driven clock for tests and demos.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinVerdict {
    Accept,
    Suppress { elapsed_secs: i64 },
}

/// Per-member cooldown gate for join notifications.
/// - First join of a member always passes.
/// - Joins inside the cooldown are suppressed and do NOT move the window.
/// - Accepted joins re-anchor the window at `now`.
#[derive(Debug, Clone, Default)]
pub struct SuppressionTracker {
    cooldown: ChronoDuration,
    last_join: HashMap<MemberId, DateTime<Utc>>,
}

impl SuppressionTracker {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown); values beyond
    /// chrono's range saturate at the largest representable window.
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::try_seconds(cooldown_secs.max(0))
                .unwrap_or(ChronoDuration::MAX),
            last_join: HashMap::new(),
        }
    }

    pub fn cooldown_secs(&self) -> i64 {
        self.cooldown.num_seconds()
    }

    /// Decide on a join at `now`; lookup and update happen in one step.
    pub fn evaluate_join(&mut self, member: MemberId, now: DateTime<Utc>) -> JoinVerdict {
        if let Some(&t0) = self.last_join.get(&member) {
            let elapsed = now.signed_duration_since(t0);
            if elapsed < self.cooldown {
                return JoinVerdict::Suppress {
                    elapsed_secs: elapsed.num_seconds(),
                };
            }
        }
        self.last_join.insert(member, now);
        JoinVerdict::Accept
    }

    /// Forget every member. Used after a gateway session resume.
    pub fn clear(&mut self) {
        self.last_join.clear();
    }

    pub fn last_join(&self, member: MemberId) -> Option<DateTime<Utc>> {
        self.last_join.get(&member).copied()
    }

    pub fn len(&self) -> usize {
        self.last_join.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_join.is_empty()
    }
}
