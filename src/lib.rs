//! N-body simulation of gravitationally interacting point bodies, plus a
//! brute-force parameter-sweep harness that searches initial conditions for
//! long-lived quasi-stable orbits (Lagrange-point librators and the like).
//!
//! The core pieces, leaf first: [`field::ScalarField`] (inverse-power
//! potentials), [`body::Body`] (a point mass with six interchangeable
//! fixed-step integrators), [`system::System`] (force aggregation, unit
//! scaling and the liveness policy), [`simulation::Simulation`] (bounded
//! fixed-step runs and persisted-folder replay) and
//! [`dispatch::SimulationMother`] (the parallel survival search).

pub mod body;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod lagrange;
pub mod liveness;
pub mod sampling;
pub mod simulation;
pub mod storage;
pub mod system;

pub use body::{Body, Integrator};
pub use dispatch::{DispatchConfig, SimulationMother};
pub use error::{Error, Result};
pub use field::{FieldTerm, ScalarField};
pub use lagrange::{LagrangeKind, LagrangePoint};
pub use liveness::AlivePredicate;
pub use sampling::SamplingMode;
pub use simulation::{Replay, RunOutcome, Simulation};
pub use system::{FieldMethod, System};

pub const G: f64 = 6.6743e-11;
