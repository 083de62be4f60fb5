//! Per-train state store.
//!
//! Each owned train has exactly one `TrainState` aggregate. Relinquishing
//! control or timing out removes the aggregate as a whole, so there is no way
//! to leave part of a train's tracking behind.
//!
//! The store is owned by the monitor and only ever mutated under its lock.

use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::telemetry::{EngineerKind, TrainId};
use crate::time::SimTime;

/// Correlates the start and end notices of one speeding episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeId(Uuid);

impl EpisodeId {
    /// Create a new random episode id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confirmed speeding episode and its one-shot warning flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedingEpisode {
    pub id: EpisodeId,
    pub start_time: SimTime,
    /// Running maximum of `|speed| - |limit|`.
    pub max_overspeed: f64,
    pub over_threshold_warned: bool,
    pub sustained_warned: bool,
}

impl SpeedingEpisode {
    #[must_use]
    pub fn open(start_time: SimTime) -> Self {
        Self {
            id: EpisodeId::new(),
            start_time,
            max_overspeed: 0.0,
            over_threshold_warned: false,
            sustained_warned: false,
        }
    }

    /// Whether any escalated warning fired during this episode.
    #[must_use]
    pub const fn escalated(&self) -> bool {
        self.over_threshold_warned || self.sustained_warned
    }
}

/// Tracking for one player-owned train.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainState {
    pub active_since: SimTime,
    pub last_seen: SimTime,
    pub speeding: Option<SpeedingEpisode>,
    /// Set while above the alert threshold but not yet confirmed.
    pub exceed_start: Option<SimTime>,
    /// `None` until the first coupling baseline is taken.
    pub axle_count: Option<u32>,
    /// Absolute speed from the previous tick.
    pub prev_speed: f64,
    pub coupling_block_until: Option<SimTime>,
    pub zero_limit_first_seen: Option<SimTime>,
    pub zero_limit_announced: bool,
    pub last_name: String,
    pub last_symbol: String,
}

impl TrainState {
    #[must_use]
    pub fn new(now: SimTime) -> Self {
        Self {
            active_since: now,
            last_seen: now,
            speeding: None,
            exceed_start: None,
            axle_count: None,
            prev_speed: 0.0,
            coupling_block_until: None,
            zero_limit_first_seen: None,
            zero_limit_announced: false,
            last_name: String::new(),
            last_symbol: String::new(),
        }
    }

    #[must_use]
    pub const fn is_speeding(&self) -> bool {
        self.speeding.is_some()
    }

    /// Whether coupling detection is suppressed at `now`.
    #[must_use]
    pub fn coupling_blocked(&self, now: SimTime) -> bool {
        self.coupling_block_until.is_some_and(|until| now < until)
    }
}

/// Mapping from train id to tracked state.
#[derive(Debug, Default)]
pub struct StateStore {
    trains: HashMap<TrainId, TrainState>,
    /// Trains whose most recent report had a player at the controls,
    /// kept across timeouts so a later hand-off is still noticed.
    players: HashSet<TrainId>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: TrainId) -> Option<&TrainState> {
        self.trains.get(&id)
    }

    pub fn get_mut(&mut self, id: TrainId) -> Option<&mut TrainState> {
        self.trains.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: TrainId) -> bool {
        self.trains.contains_key(&id)
    }

    /// Number of tracked trains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Returns the state for `id`, creating it at `now` if absent.
    ///
    /// The flag is true when the state was just created.
    pub fn track(&mut self, id: TrainId, now: SimTime) -> (&mut TrainState, bool) {
        let mut created = false;
        let state = self.trains.entry(id).or_insert_with(|| {
            created = true;
            TrainState::new(now)
        });
        (state, created)
    }

    /// Removes every piece of tracking for `id` in one step.
    ///
    /// Returns the removed aggregate, if the train was being tracked.
    pub fn release(&mut self, id: TrainId) -> Option<TrainState> {
        self.trains.remove(&id)
    }

    /// Whether the previous report for `id` had a player at the controls.
    #[must_use]
    pub fn was_player(&self, id: TrainId) -> bool {
        self.players.contains(&id)
    }

    /// Records the occupancy of the latest report. Only player occupancy is kept.
    pub fn record_kind(&mut self, id: TrainId, kind: EngineerKind) {
        if kind.is_player() {
            self.players.insert(id);
        } else {
            self.players.remove(&id);
        }
    }

    /// Trains whose `last_seen` is more than `max_age_secs` behind `now`, sorted by id.
    #[must_use]
    pub fn stale(&self, now: SimTime, max_age_secs: f64) -> Vec<TrainId> {
        let mut out: Vec<TrainId> = self
            .trains
            .iter()
            .filter(|(_, s)| crate::time::seconds_between(s.last_seen, now) > max_age_secs)
            .map(|(id, _)| *id)
            .collect();
        out.sort_unstable();
        out
    }

    /// Re-bases every pending timer onto `now` after the simulation clock
    /// started or jumped backwards.
    ///
    /// Debounce windows and the coupling block restart from scratch, open
    /// episodes restart their duration, and `last_seen` moves to `now` so the
    /// staleness check measures from the new timeline. Returns the number of
    /// trains touched.
    pub fn rebase_timers(&mut self, now: SimTime) -> usize {
        for state in self.trains.values_mut() {
            state.exceed_start = None;
            state.zero_limit_first_seen = None;
            state.coupling_block_until = None;
            state.last_seen = now;
            if let Some(episode) = state.speeding.as_mut() {
                episode.start_time = now;
            }
        }
        self.trains.len()
    }
}
