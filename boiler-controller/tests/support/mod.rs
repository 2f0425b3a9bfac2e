//! A minimal in-memory plant for driving `Controller::tick` across
//! several cycles. This is a test fixture, not a simulator to be
//! trusted for realism -- it exists to generate well-formed inboxes
//! and to let a scenario assert on what the controller did with them.

use boiler_api::{Config, Message};

pub const CYCLE_SECONDS: f64 = 5.0;

pub struct TestPlant {
    pub cfg: Config,
    pub water: f64,
    pub steam: f64,
    pump_open: Vec<bool>,
    pump_broken: Vec<bool>,
    ctrl_broken: Vec<bool>,
}

impl TestPlant {
    pub fn new(cfg: Config, water: f64, steam: f64) -> Self {
        let n = cfg.pump_count();
        TestPlant {
            cfg,
            water,
            steam,
            pump_open: vec![false; n],
            pump_broken: vec![false; n],
            ctrl_broken: vec![false; n],
        }
    }

    /// Records what the controller commanded last cycle, honoring a
    /// stuck-physical-pump or stuck-controller fault if one has been
    /// injected for that index.
    pub fn apply(&mut self, outgoing: &[Message]) {
        for msg in outgoing {
            match *msg {
                Message::OpenPump(i) if !self.pump_broken[i] => self.pump_open[i] = true,
                Message::ClosePump(i) if !self.pump_broken[i] => self.pump_open[i] = false,
                _ => {}
            }
        }
    }

    /// Advances the water level and steam rate by one cycle given
    /// which pumps are physically open right now.
    pub fn step(&mut self) {
        let inflow: f64 = (0..self.cfg.pump_count())
            .filter(|&i| self.pump_open[i])
            .map(|i| self.cfg.pump_capacity(i))
            .sum();

        self.water += CYCLE_SECONDS * (inflow - self.steam);
    }

    pub fn break_pump(&mut self, i: usize) {
        self.pump_broken[i] = true;
    }

    pub fn break_ctrl(&mut self, i: usize) {
        self.ctrl_broken[i] = true;
    }

    /// Builds the well-formed inbox a healthy transmission layer would
    /// deliver this cycle. A broken controller misreports its pump as
    /// closed regardless of the physical state; a broken pump simply
    /// never changes state no matter what `apply` was told.
    pub fn inbox(&self) -> Vec<Message> {
        let mut msgs = vec![Message::Level(self.water), Message::Steam(self.steam)];

        for i in 0..self.cfg.pump_count() {
            msgs.push(Message::PumpState(i, self.pump_open[i]));

            let reported = if self.ctrl_broken[i] {
                false
            } else {
                self.pump_open[i]
            };
            msgs.push(Message::PumpControlState(i, reported));
        }

        msgs
    }
}
