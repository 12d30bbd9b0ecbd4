//! Release strategy specs for stocks.

use mf_core::Real;
use mf_dist::{ReleaseFunction, ReleaseProfile};
use rand::Rng;

use crate::error::{ModelError, ModelResult};

/// How a stock releases stored material over subsequent periods.
///
/// Every variant discretizes into a `ReleaseProfile` at simulation setup;
/// index 0 of the profile is the immediate fraction, later entries are
/// deferred fractions.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalReleaseSpec {
    /// Constant rate per period until the stored amount is exhausted.
    FixedRate { rate: Real, delay: usize },
    /// Explicit list of per-period rates.
    List { rates: Vec<Real>, delay: usize },
    /// Rates generated by a release function (Weibull lifetime etc.).
    Function {
        function: ReleaseFunction,
        delay: usize,
    },
}

impl LocalReleaseSpec {
    /// Discretize into a release profile.
    pub fn build_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelResult<ReleaseProfile> {
        let profile = match self {
            LocalReleaseSpec::FixedRate { rate, delay } => {
                ReleaseProfile::fixed_rate(*rate, *delay)?
            }
            LocalReleaseSpec::List { rates, delay } => ReleaseProfile::from_list(rates, *delay),
            LocalReleaseSpec::Function { function, delay } => {
                ReleaseProfile::from_function(function, *delay, rng)?
            }
        };
        Ok(profile)
    }
}

/// Release strategies of a target-defined-release stock: one release
/// function (and delay) per storage period, all bound to a single outgoing
/// target.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDefinedReleaseSpec {
    pub target: String,
    pub functions: Vec<ReleaseFunction>,
    pub delays: Vec<usize>,
}

impl PeriodDefinedReleaseSpec {
    /// One discretized profile per storage period.
    ///
    /// The function and delay lists must pair up one to one; a mismatch is a
    /// configuration error naming the stock.
    pub fn build_profiles<R: Rng + ?Sized>(
        &self,
        stock: &str,
        rng: &mut R,
    ) -> ModelResult<Vec<ReleaseProfile>> {
        if self.functions.len() != self.delays.len() {
            return Err(ModelError::ReleaseListMismatch {
                name: stock.to_string(),
                target: self.target.clone(),
                functions: self.functions.len(),
                delays: self.delays.len(),
            });
        }
        let mut profiles = Vec::with_capacity(self.functions.len());
        for (function, delay) in self.functions.iter().zip(&self.delays) {
            profiles.push(ReleaseProfile::from_function(function, *delay, rng)?);
        }
        Ok(profiles)
    }
}
