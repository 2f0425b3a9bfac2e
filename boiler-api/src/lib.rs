//! Shared types for the steam boiler controller.
//!
//! This crate defines the vocabulary the decision engine
//! (`boiler-controller`) and its host agree on: the boiler's physical
//! configuration, the messages that cross the plant boundary, and the
//! crate-wide error/result convention. It has no logic of its own
//! beyond validating a `Config`.

mod config;
mod error;
mod message;

pub use config::Config;
pub use error::{Error, Result};
pub use message::{Inbox, Message, Mode, Outbox};
