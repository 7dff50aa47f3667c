//! Built-in nodes.
//!
//! - `phasor`: audio-rate ramp generator with continuous phase
//! - `timer`: sample-accurate time between trigger edges
//! - `ops`: stateless elementwise math (and a one-sample FIR)

#[cfg(test)]
pub(crate) mod fixtures;
pub mod ops;
pub mod phasor;
pub mod timer;

pub use ops::{Compare, Comparison, OnePoleFir, Pow, Sqrt};
pub use phasor::{PhaseAccumulator, Phasor};
pub use timer::{EveryEdgeTimer, Timer, TimerMode, TimerOutcome, TriggerTimer};
