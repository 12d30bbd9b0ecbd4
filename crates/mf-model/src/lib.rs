//! mf-model: entity model for probabilistic material-flow networks.
//!
//! A network is described as pure data: compartment specs (flow-through,
//! accumulating sink, delayed-release stock), stochastic transfer specs on
//! the outgoing edges, release schedules for stocks, and external inflow
//! sources. The `Model` aggregate validates the description; `mf-sim`
//! compiles it into runtime state.

pub mod compartment;
pub mod error;
pub mod inflow;
pub mod model;
pub mod release;
pub mod transfer;

pub use compartment::{CompartmentKind, CompartmentSpec};
pub use error::{ModelError, ModelResult};
pub use inflow::{ExternalInflowSpec, InflowFunction, InflowKind, SampledInflow};
pub use model::Model;
pub use release::{LocalReleaseSpec, PeriodDefinedReleaseSpec};
pub use transfer::{PeriodTc, TransferKind, TransferSpec};
