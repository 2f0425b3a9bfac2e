//! Per-pump fault bookkeeping and the activation planner.
//!
//! This module owns two related but separate jobs: tracking which
//! pumps/controllers are suspected broken (`PumpBank`), and deciding
//! how many pumps should be open and which physical indices to
//! toggle to get there (`plan`). Keeping them in one module mirrors
//! how closely they're coupled in the spec -- the planner must never
//! hand a command to a pump `PumpBank` has marked failed.

use crate::physics;
use boiler_api::Config;

/// Diagnosis produced when a pump's reported state disagrees with
/// what was commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpFault {
    Pump,
    Controller,
}

/// Per-pump fault flags and the controller's belief about each
/// pump's commanded state.
#[derive(Debug, Clone)]
pub struct PumpBank {
    failed: Vec<bool>,
    ctrl_failed: Vec<bool>,
    commanded: Vec<bool>,
}

impl PumpBank {
    pub fn new(n: usize) -> Self {
        PumpBank {
            failed: vec![false; n],
            ctrl_failed: vec![false; n],
            commanded: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.commanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commanded.is_empty()
    }

    pub fn is_pump_failed(&self, i: usize) -> bool {
        self.failed[i]
    }

    pub fn is_ctrl_failed(&self, i: usize) -> bool {
        self.ctrl_failed[i]
    }

    pub fn commanded(&self, i: usize) -> bool {
        self.commanded[i]
    }

    pub fn failed_flags(&self) -> &[bool] {
        &self.failed
    }

    /// Indices of pumps currently believed to be open (i.e. the last
    /// command issued to them was "open").
    pub fn open_indices(&self) -> Vec<usize> {
        (0..self.commanded.len())
            .filter(|&i| self.commanded[i])
            .collect()
    }

    pub fn repair_pump(&mut self, i: usize) {
        self.failed[i] = false;
    }

    pub fn repair_ctrl(&mut self, i: usize) {
        self.ctrl_failed[i] = false;
    }

    /// Updates the commanded-state belief to reflect a planner
    /// decision, after the corresponding messages have been sent.
    pub fn apply_commands(&mut self, commands: &[PumpCommand]) {
        for cmd in commands {
            match *cmd {
                PumpCommand::Open(i) => self.commanded[i] = true,
                PumpCommand::Close(i) => self.commanded[i] = false,
            }
        }
    }

    /// Classifies pump `i` from its and its controller's reported
    /// state against what was actually commanded, per the
    /// fault-classification table. `within_band` is whether the
    /// current water reading falls inside the previous tick's
    /// predicted band (with the 0.8/1.2 margin already applied).
    ///
    /// Sets the corresponding fault flag and returns the diagnosis,
    /// or `None` if the pump is healthy.
    pub fn classify(
        &mut self,
        i: usize,
        pump_reported: bool,
        ctrl_reported: bool,
        within_band: bool,
    ) -> Option<PumpFault> {
        let commanded = self.commanded[i];
        let pump_matches = pump_reported == commanded;
        let ctrl_matches = ctrl_reported == commanded;

        let fault = match (pump_matches, ctrl_matches) {
            (true, true) => None,
            (true, false) if within_band => Some(PumpFault::Controller),
            (true, false) => Some(PumpFault::Pump),
            (false, _) => Some(PumpFault::Pump),
        };

        match fault {
            Some(PumpFault::Pump) => self.failed[i] = true,
            Some(PumpFault::Controller) => self.ctrl_failed[i] = true,
            None => (),
        }

        fault
    }
}

/// One command the planner wants the cycle driver to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpCommand {
    Open(usize),
    Close(usize),
}

/// Picks the `k` lowest-index, non-failed pumps, up to a limit of
/// `k`. Used both to estimate the predicted band for a candidate
/// cardinality and, after toggling, to compute the actual predicted
/// band for the set of pumps that ends up open.
fn lowest_available(failed: &[bool], k: usize) -> Vec<usize> {
    (0..failed.len())
        .filter(|&i| !failed[i])
        .take(k)
        .collect()
}

/// Chooses how many pumps should be open this cycle (`pumpsToActivate`
/// in the source terminology). Always returns a concrete cardinality
/// in `0..=N`; the "no k satisfies the band" case from the spec's
/// source-ambiguity note is resolved to 0 (close all) inside this
/// function rather than surfaced as a sentinel.
pub fn choose_cardinality(cfg: &Config, w: f64, s: f64, failed: &[bool]) -> usize {
    let n = cfg.pump_count();

    if w >= cfg.normal_max() {
        return 0;
    }

    if w < cfg.normal_min() {
        return n;
    }

    let target_mid = (cfg.normal_min() + cfg.normal_max()) / 2.0;
    let mut best: Option<(usize, f64)> = None;

    for k in 0..=n {
        let open = lowest_available(failed, k);
        let hi = physics::water_high(cfg, w, s, &open);
        let lo = physics::water_low(cfg, w, &open);

        if hi < cfg.normal_max() && lo > cfg.normal_min() {
            let deviation = ((hi + lo) / 2.0 - target_mid).abs();

            let better = match best {
                Some((_, best_dev)) => deviation < best_dev,
                None => true,
            };

            if better {
                best = Some((k, deviation));
            }
        }
    }

    best.map(|(k, _)| k).unwrap_or(0)
}

/// Decides which physical pumps to open or close to go from the
/// currently-commanded set to `target`, skipping any pump marked
/// failed. Closes highest-index-first, opens lowest-index-first, per
/// the spec's deterministic index policy.
pub fn select_pumps(bank: &PumpBank, target: usize) -> Vec<PumpCommand> {
    let n = bank.len();
    let mut commands = Vec::new();
    let mut open_count = bank.open_indices().len();

    if open_count > target {
        for i in (0..n).rev() {
            if open_count <= target {
                break;
            }
            if bank.commanded(i) && !bank.is_pump_failed(i) {
                commands.push(PumpCommand::Close(i));
                open_count -= 1;
            }
        }
    } else if open_count < target {
        for i in 0..n {
            if open_count >= target {
                break;
            }
            if !bank.commanded(i) && !bank.is_pump_failed(i) {
                commands.push(PumpCommand::Open(i));
                open_count += 1;
            }
        }
    }

    commands
}

/// Applies a planner decision and returns the predicted band
/// (`w_lo`, `w_hi`) for the pumps that end up open -- the sticky
/// state the next tick's fault oracle reads as `wMinBand`/`wMaxBand`.
pub fn predicted_band(cfg: &Config, w: f64, s: f64, open: &[usize]) -> (f64, f64) {
    (
        physics::water_low(cfg, w, open),
        physics::water_high(cfg, w, s, open),
    )
}
