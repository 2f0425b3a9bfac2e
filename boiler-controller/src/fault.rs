//! Transmission, sensor, and repair fault detection.
//!
//! Everything here is a predicate or a classification over already-
//! parsed readings -- no mailbox access except `find_repair`, which
//! still only reads, never mutates, the inbox.

use crate::mailbox::all_matches;
use boiler_api::{Inbox, Message};
use tracing::warn;

/// The margin applied to the predicted band when judging whether a
/// pump's or controller's report is consistent with reality. Chosen
/// per the spec (0.8/1.2); widening or narrowing it trades false
/// pump-fault positives against slower fault detection, but must
/// keep the safety property in §8.P1 intact.
pub const BAND_MARGIN_LOW: f64 = 0.8;
pub const BAND_MARGIN_HIGH: f64 = 1.2;

/// True if the inbox doesn't contain exactly what a well-formed tick
/// requires: one level reading, one steam reading, and exactly
/// `pump_count` reports each of pump state and pump-controller state.
pub fn transmission_failed<I: Inbox + ?Sized>(inbox: &I, pump_count: usize) -> bool {
    let levels = all_matches(inbox, |m| matches!(m, Message::Level(_)).then_some(())).len();
    let steams = all_matches(inbox, |m| matches!(m, Message::Steam(_)).then_some(())).len();
    let pump_states =
        all_matches(inbox, |m| matches!(m, Message::PumpState(_, _)).then_some(())).len();
    let ctrl_states = all_matches(inbox, |m| {
        matches!(m, Message::PumpControlState(_, _)).then_some(())
    })
    .len();

    let failed = levels != 1
        || steams != 1
        || pump_states != pump_count
        || ctrl_states != pump_count;

    if failed {
        warn!(
            levels, steams, pump_states, ctrl_states, pump_count,
            "transmission failure: malformed or missing inbox messages"
        );
    }

    failed
}

/// True if the steam reading can't be trusted: out of the plant's
/// physical range, or a decrease that the model says can't happen
/// within one cycle.
pub fn steam_sensor_failed(s: f64, last_steam: f64, max_steam: f64) -> bool {
    let failed = s < 0.0 || s > max_steam || s < last_steam;

    if failed {
        warn!(s, last_steam, max_steam, "steam sensor failure detected");
    }

    failed
}

/// True if the water reading can't be trusted: out of the tank's
/// physical range, or -- while the boiler is actively heating and no
/// pump/controller fault already explains it -- outside the band the
/// planner predicted last cycle.
pub fn water_sensor_failed(
    w: f64,
    tank_capacity: f64,
    within_predicted_band: bool,
    heater_on: bool,
    pump_or_ctrl_fault_already_explains: bool,
) -> bool {
    if w < 0.0 || w > tank_capacity {
        warn!(w, tank_capacity, "water sensor out of physical range");
        return true;
    }

    let failed = heater_on && !within_predicted_band && !pump_or_ctrl_fault_already_explains;

    if failed {
        warn!(w, "water reading outside predicted band, no other fault explains it");
    }

    failed
}

/// True if the controller must shut down this cycle regardless of
/// mode: both sensors are gone, or the effective water level has
/// crossed the safety band on the side that matters for the current
/// state (over-fill whenever not still waiting to start, or
/// under-fill while actively heating).
pub fn imminent_failure(
    water_sensor_failed: bool,
    steam_sensor_failed: bool,
    effective_water: f64,
    safety_min: f64,
    safety_max: f64,
    mode_is_waiting: bool,
    heater_on: bool,
) -> bool {
    (water_sensor_failed && steam_sensor_failed)
        || (effective_water > safety_max && !mode_is_waiting)
        || (effective_water < safety_min && heater_on)
}

/// A repair notification the plant has sent, already resolved to the
/// single fault it should clear this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    Pump(usize),
    Controller(usize),
    Steam,
    Level,
}

/// Finds the repair to act on this cycle, in the spec's priority
/// order (pump, controller, steam, level). Unlike the arity-sensitive
/// messages in `transmission_failed`, more than one repair report in
/// the same kind is legitimate (several pumps can be fixed between
/// ticks); this just takes the first one reported and leaves the rest
/// for a later cycle.
pub fn find_repair<I: Inbox + ?Sized>(inbox: &I) -> Option<Repair> {
    let pumps = all_matches(inbox, |m| match m {
        Message::PumpRepaired(i) => Some(*i),
        _ => None,
    });

    if let Some(&i) = pumps.first() {
        return Some(Repair::Pump(i));
    }

    let ctrls = all_matches(inbox, |m| match m {
        Message::PumpControlRepaired(i) => Some(*i),
        _ => None,
    });

    if let Some(&i) = ctrls.first() {
        return Some(Repair::Controller(i));
    }

    let steam = all_matches(inbox, |m| matches!(m, Message::SteamRepaired).then_some(()));

    if !steam.is_empty() {
        return Some(Repair::Steam);
    }

    let level = all_matches(inbox, |m| matches!(m, Message::LevelRepaired).then_some(()));

    if !level.is_empty() {
        return Some(Repair::Level);
    }

    None
}
