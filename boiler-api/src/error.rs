use std::fmt;

/// Enumerates the errors this crate can report. The decision engine
/// itself never fails at run time -- faults are represented as state
/// (mode, fault flags), not as `Err` values -- so the only variant in
/// practice comes from building a `Config` that doesn't describe a
/// physically sane boiler.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A bad parameter was given in a configuration, or a required
    /// band ordering invariant didn't hold.
    ConfigError(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ConfigError(v) => write!(f, "config error: {}", &v),
        }
    }
}

/// A `Result` type where the error value is a `boiler_api::Error`.
pub type Result<T> = std::result::Result<T, Error>;
