//! The steam boiler decision engine: a pure, synchronous cycle driver.
//!
//! This crate has no I/O of its own. The embedding process owns the
//! mailbox transport and the plant connection; each cycle it hands
//! this crate an [`Inbox`](boiler_api::Inbox), gets back an
//! [`Outbox`](boiler_api::Outbox) full of messages, and calls
//! [`Controller::tick`] again five seconds later.

mod controller;
mod fault;
mod mailbox;
mod mode;
mod physics;
mod pump;

pub use controller::Controller;
pub use mode::OperatingMode;
