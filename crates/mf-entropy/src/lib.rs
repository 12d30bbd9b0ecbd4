//! mf-entropy: statistical entropy of a material-flow system.
//!
//! A secondary pass over the simulation's mean flow series: flows are
//! partitioned into pipeline stages, delay (stock) flows are resolved to
//! their net node balance, units are aligned via declared conversion
//! factors, and each stage/period gets a normalized entropy value
//! describing how widely the tracked substance is dispersed.

pub mod error;
pub mod flow;

mod entropy;
mod period;

pub use entropy::{EntropyAnalysis, EntropyResults};
pub use error::{EntropyError, EntropyResult};
pub use flow::{FlowKind, FlowSeries, NodeRef, UnitConversion};
