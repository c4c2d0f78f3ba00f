use crate::*;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How long a regular reveal animation runs, in milliseconds.
pub const REVEAL_DURATION_MS: i64 = 150;
/// Explosions uncovered by the loss sweep run half again as long.
pub const SWEEP_EXPLODE_DURATION_MS: i64 = REVEAL_DURATION_MS + REVEAL_DURATION_MS / 2;
/// How long a flag or unflag animation runs, in milliseconds.
pub const FLAG_DURATION_MS: i64 = 100;
/// Extra delay added per cascade depth level, in milliseconds.
pub const CASCADE_STEP_MS: i64 = 30;
/// Extra delay between consecutive mines uncovered by the loss sweep.
pub const SWEEP_STEP_MS: i64 = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Reveal,
    Explode,
    Flag,
    Unflag,
}

/// A scheduled cell animation a renderer can poll for.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RevealEvent {
    pub coords: Coord2,
    pub starts_at: DateTime<Utc>,
    pub duration: TimeDelta,
    pub kind: EventKind,
}

impl RevealEvent {
    pub(crate) fn new(
        coords: Coord2,
        kind: EventKind,
        starts_at: DateTime<Utc>,
        duration_ms: i64,
    ) -> Self {
        Self {
            coords,
            starts_at,
            duration: TimeDelta::milliseconds(duration_ms),
            kind,
        }
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + self.duration
    }

    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at()
    }

    /// Animation progress at `now`, clamped to `0.0..=1.0`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let run = (now - self.starts_at).num_milliseconds() as f64;
        let total = self.duration.num_milliseconds() as f64;
        (run / total).clamp(0.0, 1.0)
    }
}

/// Pending reveal events keyed by cell, so a newer event for the same cell
/// replaces the one that is still running.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSchedule {
    events: BTreeMap<Coord2, RevealEvent>,
}

impl EventSchedule {
    pub(crate) fn push(&mut self, event: RevealEvent) {
        self.events.insert(event.coords, event);
    }

    /// Drops every event whose duration has fully elapsed at `now`.
    pub fn prune_finished(&mut self, now: DateTime<Utc>) {
        self.events.retain(|_, event| !event.is_finished(now));
    }

    pub fn get(&self, coords: Coord2) -> Option<&RevealEvent> {
        self.events.get(&coords)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RevealEvent> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
