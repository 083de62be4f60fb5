//! Coupling detection from axle-count changes.
//!
//! A rise in axle count means the train picked up cars. Right after a
//! coupling, or after a split (axle count drop), the simulator may briefly
//! report inconsistent counts; increases inside the block window are treated
//! as echoes and only refresh the baseline.

use log::debug;

use crate::state::TrainState;
use crate::telemetry::TrainSnapshot;
use crate::time::{secs, SimTime};

use super::events::{MonitorEvent, TrainLabel};

/// Seconds axle increases are ignored after a coupling or an axle drop.
pub const COUPLING_BLOCK_SECONDS: f64 = 5.0;

pub(crate) fn evaluate(
    state: &mut TrainState,
    hard_couple_speed: f64,
    snap: &TrainSnapshot,
    train: &TrainLabel,
    now: SimTime,
    out: &mut Vec<MonitorEvent>,
) {
    let axles = snap.axle_count;

    match state.axle_count {
        None => {}
        Some(prev) if axles == prev => {}
        Some(prev) if axles < prev => {
            debug!("train {} dropped axles {prev} -> {axles}", train.train_id);
            state.coupling_block_until = Some(now + secs(COUPLING_BLOCK_SECONDS));
        }
        Some(prev) => {
            if state.coupling_blocked(now) {
                debug!(
                    "train {} axle echo {prev} -> {axles} ignored",
                    train.train_id
                );
            } else {
                let couple_speed = state.prev_speed;
                out.push(MonitorEvent::Coupled {
                    train: train.clone(),
                    prev_axles: prev,
                    new_axles: axles,
                    couple_speed,
                    hard: couple_speed > hard_couple_speed,
                    at: now,
                });
                state.coupling_block_until = Some(now + secs(COUPLING_BLOCK_SECONDS));
            }
        }
    }

    state.axle_count = Some(axles);
    state.prev_speed = snap.speed_mph.abs();
}
