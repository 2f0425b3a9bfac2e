use crate::error::{Error, Result};
use serde::Deserialize;

/// Immutable, validated description of a boiler's physical
/// characteristics. Every other component in this crate treats a
/// `Config` value as unconditionally sane once it exists -- the
/// validation happens exactly once, here.
///
/// The cycle period `T` isn't part of this type: the spec fixes it at
/// five seconds, and the physics model (`boiler_controller::physics`)
/// uses that constant directly rather than threading it through every
/// call site.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Per-pump throughput, in volume units per second. The pump
    /// count `N` is `pump_capacity.len()`.
    pump_capacity: Vec<f64>,

    /// Total boiler capacity.
    tank_capacity: f64,

    /// Normal operating band.
    normal_min: f64,
    normal_max: f64,

    /// Safety band. Violating this while heating is an emergency.
    safety_min: f64,
    safety_max: f64,

    /// Maximum steam production rate the plant can reach.
    max_steam_rate: f64,
}

impl Config {
    /// Validates the band ordering and pump configuration required by
    /// every other component, then returns the immutable value.
    ///
    /// Returns `Error::ConfigError` if:
    /// - `pump_capacity` is empty,
    /// - any pump's throughput is not positive,
    /// - `safety_min < normal_min < normal_max < safety_max` doesn't hold, or
    /// - `tank_capacity` or `max_steam_rate` is not positive.
    pub fn new(
        pump_capacity: Vec<f64>,
        tank_capacity: f64,
        normal_min: f64,
        normal_max: f64,
        safety_min: f64,
        safety_max: f64,
        max_steam_rate: f64,
    ) -> Result<Config> {
        let cfg = Config {
            pump_capacity,
            tank_capacity,
            normal_min,
            normal_max,
            safety_min,
            safety_max,
            max_steam_rate,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a `Config` out of a TOML document and validates it in
    /// one step, mirroring the `parse_into`-style helper drivers in
    /// this codebase use for their own configuration sections.
    pub fn from_toml(contents: &str) -> Result<Config> {
        let cfg: Config = toml::from_str(contents)
            .map_err(|e| Error::ConfigError(format!("{}", e)))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.pump_capacity.is_empty() {
            return Err(Error::ConfigError(
                "at least one pump is required".into(),
            ));
        }

        if self.pump_capacity.iter().any(|c| *c <= 0.0) {
            return Err(Error::ConfigError(
                "pump throughput must be positive".into(),
            ));
        }

        if self.tank_capacity <= 0.0 {
            return Err(Error::ConfigError(
                "tank_capacity must be positive".into(),
            ));
        }

        if self.max_steam_rate <= 0.0 {
            return Err(Error::ConfigError(
                "max_steam_rate must be positive".into(),
            ));
        }

        if !(self.safety_min < self.normal_min
            && self.normal_min < self.normal_max
            && self.normal_max < self.safety_max)
        {
            return Err(Error::ConfigError(
                "bands must satisfy safety_min < normal_min < normal_max < safety_max".into(),
            ));
        }

        if self.normal_max > self.tank_capacity {
            return Err(Error::ConfigError(
                "normal_max cannot exceed tank_capacity".into(),
            ));
        }

        Ok(())
    }

    /// Number of feed pumps, `N`.
    pub fn pump_count(&self) -> usize {
        self.pump_capacity.len()
    }

    /// Throughput of pump `i`, in volume units per second.
    pub fn pump_capacity(&self, i: usize) -> f64 {
        self.pump_capacity[i]
    }

    /// Sum of the throughput of the given pump indices.
    pub fn total_capacity<I: IntoIterator<Item = usize>>(&self, pumps: I) -> f64 {
        pumps.into_iter().map(|i| self.pump_capacity[i]).sum()
    }

    pub fn tank_capacity(&self) -> f64 {
        self.tank_capacity
    }

    pub fn normal_min(&self) -> f64 {
        self.normal_min
    }

    pub fn normal_max(&self) -> f64 {
        self.normal_max
    }

    pub fn safety_min(&self) -> f64 {
        self.safety_min
    }

    pub fn safety_max(&self) -> f64 {
        self.safety_max
    }

    pub fn max_steam_rate(&self) -> f64 {
        self.max_steam_rate
    }
}
