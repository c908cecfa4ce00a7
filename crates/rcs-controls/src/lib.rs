//! Control primitives for the primary-coolant pressure and level loops.
//!
//! Everything here is a small, deterministic, fixed-timestep building block:
//! - PI controller with integral clamp, output clamp and inhibit input
//! - First-order lag followed by a slew limiter (actuator)
//! - Fixed-capacity transport delay with explicit priming state
//! - First-order low-pass filter and rate estimator
//! - Dwell timers for debounced state-machine transitions
//!
//! Configuration structs are immutable; mutable state lives in separate
//! state structs owned by the caller, so a tick can be computed from
//! `(&config, &state)` into a new state.

pub mod actuator;
pub mod controller;
pub mod delay;
pub mod dwell;
pub mod error;
pub mod filter;

pub use actuator::{ActuatorState, LagSlewActuator};
pub use controller::{Action, PIController, PIControllerState, PIOutput};
pub use delay::{DelayPhase, MAX_DELAY_SLOTS, TransportDelay};
pub use dwell::DwellTimer;
pub use error::{ControlError, ControlResult};
pub use filter::{LowPassFilter, RateEstimator, RateState};
