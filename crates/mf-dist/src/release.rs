//! Release-rate schedules for delayed-release stocks.
//!
//! A `ReleaseProfile` describes, for material stored in some period P, which
//! fraction leaves in P (index 0), P+1 (index 1), and so on. Profiles are
//! discretized once at model-compile time; the simulation only reads them.

use mf_core::Real;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{DistError, DistResult};

/// Hard cap on generated profile length when a release function never
/// reaches a cumulative release of 1.
pub const MAX_PROFILE_PERIODS: usize = 500;

/// A per-period release-rate generator.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseFunction {
    /// The same rate every period.
    FixedRate(Real),
    /// Explicit rate per period; zero beyond the end of the list.
    List(Vec<Real>),
    /// A random rate drawn from the sample list each period.
    RandomRate(Vec<Real>),
    /// Rate from a Weibull lifetime distribution, probability mass
    /// discretized per period at the interval midpoint.
    Weibull {
        shape: Real,
        scale: Real,
        location: Option<Real>,
    },
}

impl ReleaseFunction {
    /// Release rate for one period offset.
    pub fn rate<R: Rng + ?Sized>(&self, period: usize, rng: &mut R) -> DistResult<Real> {
        match self {
            ReleaseFunction::FixedRate(rate) => Ok(*rate),
            ReleaseFunction::List(rates) => Ok(rates.get(period).copied().unwrap_or(0.0)),
            ReleaseFunction::RandomRate(sample) => sample
                .choose(rng)
                .copied()
                .ok_or(DistError::EmptySample { what: "random rate" }),
            ReleaseFunction::Weibull {
                shape,
                scale,
                location,
            } => {
                if *shape <= 0.0 || *scale <= 0.0 {
                    return Err(DistError::InvalidParameters {
                        what: "weibull",
                        details: format!("shape {shape} and scale {scale} must be positive"),
                    });
                }
                Ok(weibull_rate(period, *shape, *scale, location.unwrap_or(0.0)))
            }
        }
    }
}

/// Weibull probability density, shifted by `location`.
fn weibull_pdf(x: Real, shape: Real, scale: Real, location: Real) -> Real {
    let z = (x - location) / scale;
    if z <= 0.0 {
        return 0.0;
    }
    (shape / scale) * z.powf(shape - 1.0) * (-z.powf(shape)).exp()
}

/// Midpoint discretization of the Weibull density at one period.
fn weibull_midpoint(period: Real, shape: Real, scale: Real, location: Real) -> Real {
    0.5 * (weibull_pdf(period - 0.5, shape, scale, location)
        + weibull_pdf(period, shape, scale, location))
}

/// Discretized Weibull release rate.
///
/// The first period after the location offset absorbs the residual mass so
/// that the rates over the evaluated horizon sum to 1; the density itself
/// may diverge near the origin for shape < 1 and is forced to 0 there.
fn weibull_rate(period: usize, shape: Real, scale: Real, location: Real) -> Real {
    let first = location.ceil().max(1.0) as usize;
    if period < first {
        return 0.0;
    }
    if period == first {
        let mut tail = 0.0;
        for j in (first + 1)..30 {
            tail += weibull_midpoint(j as Real, shape, scale, location);
        }
        return 1.0 - tail;
    }
    weibull_midpoint(period as Real, shape, scale, location)
}

/// A discretized release schedule: `rates[0]` is the immediate fraction,
/// later entries are deferred fractions. Entries sum to at most 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseProfile {
    rates: Vec<Real>,
}

impl ReleaseProfile {
    /// Constant rate per period until the stored amount is exhausted.
    ///
    /// `FixedRate { rate: 0.25, delay: 0 }` yields `[0.25, 0.25, 0.25, 0.25]`.
    pub fn fixed_rate(rate: Real, delay: usize) -> DistResult<Self> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(DistError::InvalidReleaseRate { rate });
        }
        let mut rates = vec![0.0; delay];
        let mut remainder: Real = 1.0;
        while remainder > 0.0 {
            rates.push(rate.min(remainder));
            remainder -= rate;
        }
        Ok(Self { rates })
    }

    /// Explicit list of rates after a delay.
    pub fn from_list(list: &[Real], delay: usize) -> Self {
        let mut rates = vec![0.0; delay];
        rates.extend_from_slice(list);
        Self { rates }
    }

    /// Evaluate a release function period by period until the cumulative
    /// release reaches 1 (or the period cap), then trim trailing zeros and
    /// clamp any overshoot on the last nonzero entry.
    pub fn from_function<R: Rng + ?Sized>(
        function: &ReleaseFunction,
        delay: usize,
        rng: &mut R,
    ) -> DistResult<Self> {
        let mut generated: Vec<Real> = Vec::new();
        let mut total: Real = 0.0;
        let mut last_nonzero = 0;
        let mut period = 0;

        while total < 1.0 && period < MAX_PROFILE_PERIODS {
            let rate = function.rate(period, rng)?;
            generated.push(rate);
            if rate != 0.0 {
                last_nonzero = period;
            }
            total += rate;
            period += 1;
        }

        if period != last_nonzero + 1 {
            generated.truncate(last_nonzero + 1);
        }
        if total > 1.0 {
            if let Some(last) = generated.last_mut() {
                *last += 1.0 - total;
            }
        }

        let mut rates = vec![0.0; delay];
        rates.append(&mut generated);
        Ok(Self { rates })
    }

    /// Fraction of stored material that passes through in the storage period
    /// itself.
    pub fn immediate_rate(&self) -> Real {
        self.rates.first().copied().unwrap_or(0.0)
    }

    pub fn rates(&self) -> &[Real] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fixed_rate_quarters() {
        let profile = ReleaseProfile::fixed_rate(0.25, 0).unwrap();
        assert_eq!(profile.rates(), &[0.25, 0.25, 0.25, 0.25]);
        assert_eq!(profile.immediate_rate(), 0.25);
    }

    #[test]
    fn fixed_rate_with_remainder_and_delay() {
        let profile = ReleaseProfile::fixed_rate(0.3, 2).unwrap();
        assert_eq!(profile.rates()[..2], [0.0, 0.0]);
        let body = &profile.rates()[2..];
        assert_eq!(body.len(), 4);
        assert!((body.iter().sum::<Real>() - 1.0).abs() < 1e-12);
        assert!((body[3] - 0.1).abs() < 1e-12);
        assert_eq!(profile.immediate_rate(), 0.0);
    }

    #[test]
    fn fixed_rate_rejects_degenerate_rates() {
        assert!(ReleaseProfile::fixed_rate(0.0, 0).is_err());
        assert!(ReleaseProfile::fixed_rate(1.5, 0).is_err());
    }

    #[test]
    fn list_release_is_delay_padded() {
        let profile = ReleaseProfile::from_list(&[0.5, 0.5], 1);
        assert_eq!(profile.rates(), &[0.0, 0.5, 0.5]);
    }

    #[test]
    fn function_profile_clamps_overshoot() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = ReleaseFunction::FixedRate(0.4);
        let profile = ReleaseProfile::from_function(&f, 0, &mut rng).unwrap();
        // 0.4 + 0.4 + 0.4 overshoots; the last entry is clamped back.
        assert_eq!(profile.len(), 3);
        assert!((profile.rates().iter().sum::<Real>() - 1.0).abs() < 1e-12);
        assert!((profile.rates()[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn function_profile_trims_trailing_zeros() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = ReleaseFunction::List(vec![0.4, 0.0, 0.3]);
        let profile = ReleaseProfile::from_function(&f, 0, &mut rng).unwrap();
        // Generation hits the 500-period cap at total 0.7, then trims the
        // zero tail back to the last nonzero rate.
        assert_eq!(profile.rates(), &[0.4, 0.0, 0.3]);
    }

    #[test]
    fn weibull_profile_mass_sums_to_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = ReleaseFunction::Weibull {
            shape: 1.5,
            scale: 4.0,
            location: None,
        };
        let profile = ReleaseProfile::from_function(&f, 0, &mut rng).unwrap();
        assert_eq!(profile.rates()[0], 0.0);
        let total: Real = profile.rates().iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "total {total}");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fixed_rate_profiles_release_everything(
                rate in 0.01_f64..=1.0_f64,
                delay in 0_usize..4,
            ) {
                let profile = ReleaseProfile::fixed_rate(rate, delay).unwrap();
                let total: Real = profile.rates().iter().sum();
                prop_assert!((total - 1.0).abs() < 1e-9, "total {} for rate {}", total, rate);
                prop_assert!(profile.rates()[..delay].iter().all(|&r| r == 0.0));
                prop_assert!(profile.rates().iter().all(|&r| r >= 0.0));
            }
        }
    }

    #[test]
    fn weibull_with_location_delays_onset() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = ReleaseFunction::Weibull {
            shape: 2.0,
            scale: 3.0,
            location: Some(2.0),
        };
        let profile = ReleaseProfile::from_function(&f, 0, &mut rng).unwrap();
        assert_eq!(profile.rates()[0], 0.0);
        assert_eq!(profile.rates()[1], 0.0);
        assert!(profile.rates()[2] > 0.0);
    }
}
