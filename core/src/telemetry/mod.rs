//! telemetry/mod.rs
//! Counters, stage timers, and immutable snapshots.

pub mod counters;
pub mod snapshot;
pub mod timers;

pub use counters::*;
pub use snapshot::*;
pub use timers::*;
