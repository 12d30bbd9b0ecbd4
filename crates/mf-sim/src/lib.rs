//! mf-sim: the Monte-Carlo material-flow simulation engine.
//!
//! Drives runs x periods over a compiled compartment network:
//! - per-period transfer-coefficient sampling and priority-ordered
//!   normalization onto the probability simplex
//! - per-period dense equilibrium solve of `(I - T) x = inflows`
//! - release scheduling for delayed-release stocks
//! - flow/inventory logging into runs x periods record matrices
//! - post-hoc accessors over the logged records, by compartment and by
//!   category

pub mod error;
pub mod records;
pub mod sim;

mod engine;
mod normalize;
mod setup;

pub use error::{SimError, SimResult};
pub use records::{CompartmentClass, CompartmentView};
pub use sim::{SimOptions, Simulator};
