//! mf-dist: sampling primitives for probabilistic material-flow models.
//!
//! Provides:
//! - `Sampler`: scalar draws (fixed, uniform, normal, triangular, choice)
//!   used for transfer coefficients and inflow uncertainty
//! - `ReleaseFunction` + `ReleaseProfile`: per-period release-rate schedules
//!   for delayed-release stocks, including the Weibull-shaped lifetime model

pub mod error;
pub mod release;
pub mod sampler;

pub use error::{DistError, DistResult};
pub use release::{MAX_PROFILE_PERIODS, ReleaseFunction, ReleaseProfile};
pub use sampler::Sampler;
