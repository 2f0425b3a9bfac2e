//! The cycle driver: the entry point invoked once per tick.
//!
//! `Controller::tick` is the only place state actually changes. It
//! applies the guards from the spec's mode transition table in order,
//! then dispatches to the current mode's action, then refreshes the
//! last-known-good readings. Everything it calls -- `fault`, `pump`,
//! `physics` -- is either a pure function or a small, independently
//! testable piece of state (`PumpBank`).

use crate::fault::{self, Repair};
use crate::mailbox;
use crate::mode::OperatingMode;
use crate::physics;
use crate::pump::{self, PumpBank, PumpCommand, PumpFault};
use boiler_api::{Config, Inbox, Message, Mode, Outbox};
use tracing::{debug, error, info, warn};

/// Runs the decision engine for one boiler. Constructed once per
/// boiler for the lifetime of the process; `tick` is called once per
/// five-second period with that period's inbox and a fresh outbox.
pub struct Controller {
    cfg: Config,
    mode: OperatingMode,
    pumps: PumpBank,
    water_sensor_failed: bool,
    steam_sensor_failed: bool,
    last_water: f64,
    last_steam: f64,
    heater_on: bool,
    emptying: bool,
    /// The predicted band from the previous cycle's planner
    /// (`wMinBand`/`wMaxBand`), read by this cycle's fault oracle.
    /// `None` before the planner has ever run.
    band: Option<(f64, f64)>,
}

impl Controller {
    /// Builds a new controller in mode `WAITING` for the given
    /// boiler. `tick` can't be called before this, and nothing about
    /// this call can fail: `Config` is validated at its own
    /// construction (see `boiler_api::Config::new`), so by the time
    /// one reaches here it's unconditionally usable.
    pub fn new(cfg: Config) -> Self {
        let n = cfg.pump_count();

        Controller {
            cfg,
            mode: OperatingMode::Waiting,
            pumps: PumpBank::new(n),
            water_sensor_failed: false,
            steam_sensor_failed: false,
            last_water: 0.0,
            last_steam: 0.0,
            heater_on: false,
            emptying: false,
            band: None,
        }
    }

    /// A human-readable name for the current mode. For debug display
    /// only -- nothing in this crate parses it back.
    pub fn status(&self) -> String {
        self.mode.to_string()
    }

    /// Runs one cycle: reads `incoming`, decides what to do, and
    /// appends the resulting messages to `outgoing`. Never fails --
    /// every fault this engine can detect is represented as a mode
    /// transition or a flag, never as an `Err`.
    pub fn tick<I, O>(&mut self, incoming: &I, outgoing: &mut O)
    where
        I: Inbox + ?Sized,
        O: Outbox + ?Sized,
    {
        // EMERGENCY_STOP is terminal: once there, every subsequent
        // cycle just re-asserts the stopped state and does nothing
        // else, regardless of what's in the inbox.
        if self.mode.is_emergency_stop() {
            self.enter_emergency_stop(outgoing);
            return;
        }

        let n = self.cfg.pump_count();

        if fault::transmission_failed(incoming, n) {
            error!("transmission failure, entering EMERGENCY_STOP");
            self.mode = OperatingMode::EmergencyStop;
            self.enter_emergency_stop(outgoing);
            return;
        }

        let water = mailbox::only_match(incoming, |m| match m {
            Message::Level(v) => Some(*v),
            _ => None,
        })
        .expect("transmission_failed already confirmed exactly one LEVEL message");
        let steam = mailbox::only_match(incoming, |m| match m {
            Message::Steam(v) => Some(*v),
            _ => None,
        })
        .expect("transmission_failed already confirmed exactly one STEAM message");

        let mut pump_reported = vec![false; n];
        for (i, b) in mailbox::all_matches(incoming, |m| match m {
            Message::PumpState(i, b) => Some((*i, *b)),
            _ => None,
        }) {
            pump_reported[i] = b;
        }

        let mut ctrl_reported = vec![false; n];
        for (i, b) in mailbox::all_matches(incoming, |m| match m {
            Message::PumpControlState(i, b) => Some((*i, *b)),
            _ => None,
        }) {
            ctrl_reported[i] = b;
        }

        debug!(water, steam, "tick: parsed readings");

        // 1. Repair detection: unconditionally returns to NORMAL;
        // later steps in this same tick can still reclassify.
        if let Some(repair) = fault::find_repair(incoming) {
            self.apply_repair(repair, outgoing);
        }

        // 2. Pump/controller fault classification. Pumps already
        // flagged are skipped -- repeated disagreement from an
        // already-known-bad pump isn't a new event. Only the first
        // freshly-detected fault is acted on this cycle.
        let within_margin = self.within_band(water, fault::BAND_MARGIN_LOW, fault::BAND_MARGIN_HIGH);
        let mut new_pump_or_ctrl_fault = false;

        for i in 0..n {
            if self.pumps.is_pump_failed(i) || self.pumps.is_ctrl_failed(i) {
                continue;
            }

            if let Some(f) = self
                .pumps
                .classify(i, pump_reported[i], ctrl_reported[i], within_margin)
            {
                new_pump_or_ctrl_fault = true;

                match f {
                    PumpFault::Pump => outgoing.send(Message::PumpFailureDetection(i)),
                    PumpFault::Controller => {
                        outgoing.send(Message::PumpControlFailureDetection(i))
                    }
                }

                break;
            }
        }

        let any_pump_or_ctrl_fault = new_pump_or_ctrl_fault
            || (0..n).any(|i| self.pumps.is_pump_failed(i) || self.pumps.is_ctrl_failed(i));

        // 3. Steam sensor fault.
        let steam_newly_failed = !self.steam_sensor_failed
            && fault::steam_sensor_failed(steam, self.last_steam, self.cfg.max_steam_rate());

        if steam_newly_failed {
            self.steam_sensor_failed = true;
            outgoing.send(Message::SteamFailureDetection);
        }

        // 4. Water sensor fault. Uses the raw predicted band, with no
        // margin -- the margin is specific to pump/controller
        // classification (§4.3).
        let within_band_raw = self.within_band(water, 1.0, 1.0);
        let water_newly_failed = !self.water_sensor_failed
            && fault::water_sensor_failed(
                water,
                self.cfg.tank_capacity(),
                within_band_raw,
                self.heater_on,
                any_pump_or_ctrl_fault,
            );

        if water_newly_failed {
            self.water_sensor_failed = true;
            outgoing.send(Message::LevelFailureDetection);
        }

        // 5. NORMAL-only transitions into a degraded state. Checked
        // against the *current* fault flags, not just this tick's
        // fresh detections: a repair earlier in this same tick (step
        // 1) unconditionally sets the mode to NORMAL, but if a
        // different, still-unrepaired fault survives, invariant 2
        // (NORMAL implies no fault flags) demands we reclassify right
        // back down rather than leave the flag and the mode out of
        // sync.
        if self.mode == OperatingMode::Normal {
            if self.water_sensor_failed {
                warn!("NORMAL -> RESCUE: water sensor failure");
                self.mode = OperatingMode::Rescue;
            } else if any_pump_or_ctrl_fault || self.steam_sensor_failed {
                warn!("NORMAL -> DEGRADED: pump, controller, or steam fault");
                self.mode = OperatingMode::Degraded;
            }
        }

        // 6. Imminent failure check, evaluated for every non-stopped mode.
        let effective_water = if self.water_sensor_failed {
            self.last_water
        } else {
            water
        };

        if fault::imminent_failure(
            self.water_sensor_failed,
            self.steam_sensor_failed,
            effective_water,
            self.cfg.safety_min(),
            self.cfg.safety_max(),
            self.mode == OperatingMode::Waiting,
            self.heater_on,
        ) {
            error!(effective_water, "imminent failure, entering EMERGENCY_STOP");
            self.mode = OperatingMode::EmergencyStop;
            self.enter_emergency_stop(outgoing);
            return;
        }

        // 7. Per-mode dispatch.
        match self.mode {
            OperatingMode::Waiting => self.run_waiting(water, steam, incoming, outgoing),
            OperatingMode::Ready => self.run_ready(incoming, outgoing),
            OperatingMode::Normal => self.run_normal(water, steam, outgoing),
            OperatingMode::Degraded => self.run_degraded(water, steam, outgoing),
            OperatingMode::Rescue => self.run_rescue(steam, outgoing),
            OperatingMode::EmergencyStop => unreachable!("handled at the top of tick()"),
        }

        // 8. Refresh last-known-good readings. `run_waiting` can also
        // reach EMERGENCY_STOP (nonzero steam, or a sensor fault, while
        // still waiting to start) without returning out of `tick`
        // early the way the transmission/imminent-failure checks do,
        // so this still has to honor "not in EMERGENCY_STOP" itself.
        if !self.mode.is_emergency_stop() {
            if !self.water_sensor_failed {
                self.last_water = water;
            }
            if !self.steam_sensor_failed {
                self.last_steam = steam;
            }
        }
    }

    /// Whether `water` falls inside the previous cycle's predicted
    /// band, after scaling the band bounds by `lo_margin`/`hi_margin`.
    /// With no predicted band yet (before the planner has ever run),
    /// there's nothing to conflict with, so this reports `true`.
    fn within_band(&self, water: f64, lo_margin: f64, hi_margin: f64) -> bool {
        match self.band {
            Some((lo, hi)) => water >= lo * lo_margin && water <= hi * hi_margin,
            None => true,
        }
    }

    fn apply_repair<O: Outbox + ?Sized>(&mut self, repair: Repair, outgoing: &mut O) {
        match repair {
            Repair::Pump(i) => {
                self.pumps.repair_pump(i);
                outgoing.send(Message::PumpRepairedAck(i));
            }
            Repair::Controller(i) => {
                self.pumps.repair_ctrl(i);
                outgoing.send(Message::PumpControlRepairedAck(i));
            }
            Repair::Steam => {
                self.steam_sensor_failed = false;
                outgoing.send(Message::SteamRepairedAck);
            }
            Repair::Level => {
                self.water_sensor_failed = false;
                outgoing.send(Message::LevelRepairedAck);
            }
        }

        info!(?repair, "repair acknowledged, returning to NORMAL");
        self.mode = OperatingMode::Normal;
    }

    fn run_waiting<I, O>(&mut self, water: f64, steam: f64, incoming: &I, outgoing: &mut O)
    where
        I: Inbox + ?Sized,
        O: Outbox + ?Sized,
    {
        if steam != 0.0 || self.water_sensor_failed || self.steam_sensor_failed {
            error!(steam, "nonzero steam or sensor fault while waiting, entering EMERGENCY_STOP");
            self.mode = OperatingMode::EmergencyStop;
            self.enter_emergency_stop(outgoing);
            return;
        }

        let waiting_present = mailbox::only_match(incoming, |m| {
            matches!(m, Message::BoilerWaiting).then_some(())
        })
        .is_some();

        if !waiting_present {
            return;
        }

        outgoing.send(Message::Mode(Mode::Initialisation));

        if water < self.cfg.normal_min() {
            self.run_plan(water, steam, outgoing);
        } else if water > self.cfg.normal_max() {
            if !self.emptying {
                outgoing.send(Message::Valve);
                self.emptying = true;
            }
        }

        if water > self.cfg.normal_min() && water < self.cfg.normal_max() {
            info!("WAITING -> READY");
            self.mode = OperatingMode::Ready;
        }
    }

    fn run_ready<I, O>(&mut self, incoming: &I, outgoing: &mut O)
    where
        I: Inbox + ?Sized,
        O: Outbox + ?Sized,
    {
        outgoing.send(Message::ProgramReady);

        let units_ready = mailbox::only_match(incoming, |m| {
            matches!(m, Message::PhysicalUnitsReady).then_some(())
        })
        .is_some();

        if units_ready {
            info!("READY -> NORMAL");
            outgoing.send(Message::Mode(Mode::Normal));
            self.heater_on = true;
            self.mode = OperatingMode::Normal;
        }
    }

    fn run_normal<O: Outbox + ?Sized>(&mut self, water: f64, steam: f64, outgoing: &mut O) {
        outgoing.send(Message::Mode(Mode::Normal));
        self.run_plan(water, steam, outgoing);
    }

    fn run_degraded<O: Outbox + ?Sized>(&mut self, water: f64, steam: f64, outgoing: &mut O) {
        outgoing.send(Message::Mode(Mode::Degraded));

        let s = if self.steam_sensor_failed {
            physics::estimate_steam(&self.cfg, self.last_water, water, &self.pumps.open_indices())
        } else {
            steam
        };

        self.run_plan(water, s, outgoing);
    }

    fn run_rescue<O: Outbox + ?Sized>(&mut self, steam: f64, outgoing: &mut O) {
        outgoing.send(Message::Mode(Mode::Rescue));

        let w = self.last_water;

        self.run_plan(w, steam, outgoing);

        // Feed-forward estimator: since the water sensor can't be
        // trusted, advance the belief using the physics model instead
        // of a reading.
        self.last_water =
            physics::estimate_water(&self.cfg, self.last_water, steam, &self.pumps.open_indices());
    }

    /// Shared planner invocation: chooses a cardinality, toggles the
    /// physical pumps to reach it, and records the resulting
    /// predicted band for the next cycle's fault oracle.
    fn run_plan<O: Outbox + ?Sized>(&mut self, water: f64, steam: f64, outgoing: &mut O) {
        let k = pump::choose_cardinality(&self.cfg, water, steam, self.pumps.failed_flags());
        let commands = pump::select_pumps(&self.pumps, k);

        debug!(k, ?commands, "planner decision");

        for cmd in &commands {
            match *cmd {
                PumpCommand::Open(i) => outgoing.send(Message::OpenPump(i)),
                PumpCommand::Close(i) => outgoing.send(Message::ClosePump(i)),
            }
        }

        self.pumps.apply_commands(&commands);

        let open = self.pumps.open_indices();
        self.band = Some(pump::predicted_band(&self.cfg, water, steam, &open));
    }

    /// Closes every controllable pump, emits the triple `MODE`
    /// notification, opens the valve if it isn't open already, and
    /// clears `heaterOn`. Runs every cycle spent in `EMERGENCY_STOP`,
    /// not just the one that entered it.
    fn enter_emergency_stop<O: Outbox + ?Sized>(&mut self, outgoing: &mut O) {
        let commands: Vec<PumpCommand> = (0..self.pumps.len())
            .filter(|&i| self.pumps.commanded(i) && !self.pumps.is_pump_failed(i))
            .map(PumpCommand::Close)
            .collect();

        for cmd in &commands {
            if let PumpCommand::Close(i) = *cmd {
                outgoing.send(Message::ClosePump(i));
            }
        }

        self.pumps.apply_commands(&commands);

        for _ in 0..3 {
            outgoing.send(Message::Mode(Mode::EmergencyStop));
        }

        if !self.emptying {
            outgoing.send(Message::Valve);
            self.emptying = true;
        }

        self.heater_on = false;
    }
}
