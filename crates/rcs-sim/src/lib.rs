//! Fixed-timestep primary-coolant heatup engine.
//!
//! Provides:
//! - Water-solid pressure control with a letdown trim loop and compressibility physics
//! - Bubble detection, drain and stabilisation with a saturated two-phase pressurizer
//! - Coupled RCS/pressurizer pressure solve blended in by forced-flow fraction
//! - A mass ledger with a single boundary-flow application per tick and audits
//! - Relief valve hysteresis and heater dynamics
//!
//! [`PrimarySystem::step`] is the only way state advances.

pub mod bubble;
pub mod config;
pub mod coupled;
pub mod error;
pub mod events;
pub mod heat;
pub mod ledger;
pub mod regime;
pub mod relief;
pub mod snapshot;
pub mod solid;
pub mod state;

pub use bubble::{BubbleController, PzrEquilibrium, bubble_trigger, solve_equilibrium};
pub use config::{
    BubbleConfig, CoupledConfig, DiagnosticsConfig, Geometry, PlantConfig, ReliefConfig,
    SolidControlConfig, ThermalConfig,
};
pub use coupled::{SolverReport, SolverStatus};
pub use error::{SimError, SimResult};
pub use events::TransitionEvent;
pub use ledger::{AuditReport, BoundaryFlow, ComponentMasses, InternalTransfer, MassInventory};
pub use regime::PrimarySystem;
pub use relief::{ReliefFlow, relief_flow};
pub use snapshot::Snapshot;
pub use solid::{SolidCommand, SolidController};
pub use state::{
    BubblePhase, ControlMode, DiagnosticFlags, InitialConditions, PressureModel, PrimarySystemState,
    SolidMode, TickInputs,
};
