//! Scheduler layer
//!
//! Drives a poller's ticks on its schedule, switching between the normal
//! and the error interval depending on how each tick went.

pub mod interval;

pub use interval::{IntervalScheduler, TickOutcome};
