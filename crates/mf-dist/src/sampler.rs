//! Scalar sampling distributions.

use mf_core::Real;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal, Triangular, Uniform};

use crate::error::{DistError, DistResult};

/// A scalar sampling distribution.
///
/// Transfer coefficients and inflow uncertainties are parametrized with one
/// of these; `sample` draws a fresh value per period (TCs) or per run
/// (inflow derivation factors).
#[derive(Debug, Clone, PartialEq)]
pub enum Sampler {
    /// Deterministic value.
    Fixed(Real),
    /// Uniform over [low, high).
    Uniform { low: Real, high: Real },
    /// Normal with mean and standard deviation.
    Normal { mean: Real, std_dev: Real },
    /// Triangular over [low, high] with the given mode.
    Triangular { low: Real, mode: Real, high: Real },
    /// Uniform draw from an explicit sample list.
    Choice(Vec<Real>),
}

impl Sampler {
    /// Check parameters without drawing. Invalid parameters are a model
    /// configuration error and must surface before the simulation starts.
    pub fn validate(&self) -> DistResult<()> {
        match self {
            Sampler::Fixed(_) => Ok(()),
            Sampler::Uniform { low, high } => {
                if low < high {
                    Ok(())
                } else {
                    Err(DistError::InvalidParameters {
                        what: "uniform",
                        details: format!("low {low} must be below high {high}"),
                    })
                }
            }
            Sampler::Normal { std_dev, .. } => {
                if std_dev.is_finite() && *std_dev >= 0.0 {
                    Ok(())
                } else {
                    Err(DistError::InvalidParameters {
                        what: "normal",
                        details: format!("standard deviation {std_dev} must be non-negative"),
                    })
                }
            }
            Sampler::Triangular { low, mode, high } => {
                if low <= mode && mode <= high && low < high {
                    Ok(())
                } else {
                    Err(DistError::InvalidParameters {
                        what: "triangular",
                        details: format!("need low <= mode <= high, got {low}, {mode}, {high}"),
                    })
                }
            }
            Sampler::Choice(sample) => {
                if sample.is_empty() {
                    Err(DistError::EmptySample { what: "choice" })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DistResult<Real> {
        match self {
            Sampler::Fixed(value) => Ok(*value),
            Sampler::Uniform { low, high } => {
                self.validate()?;
                Ok(Uniform::new(*low, *high).sample(rng))
            }
            Sampler::Normal { mean, std_dev } => {
                let normal =
                    Normal::new(*mean, *std_dev).map_err(|e| DistError::InvalidParameters {
                        what: "normal",
                        details: e.to_string(),
                    })?;
                Ok(normal.sample(rng))
            }
            Sampler::Triangular { low, mode, high } => {
                let triangular = Triangular::new(*low, *high, *mode).map_err(|e| {
                    DistError::InvalidParameters {
                        what: "triangular",
                        details: format!("{e:?}"),
                    }
                })?;
                Ok(triangular.sample(rng))
            }
            Sampler::Choice(sample) => sample
                .choose(rng)
                .copied()
                .ok_or(DistError::EmptySample { what: "choice" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fixed_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = Sampler::Fixed(0.35);
        assert_eq!(s.sample(&mut rng).unwrap(), 0.35);
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = Sampler::Uniform {
            low: 0.2,
            high: 0.4,
        };
        for _ in 0..100 {
            let v = s.sample(&mut rng).unwrap();
            assert!((0.2..0.4).contains(&v));
        }
    }

    #[test]
    fn triangular_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = Sampler::Triangular {
            low: 0.1,
            mode: 0.2,
            high: 0.5,
        };
        for _ in 0..100 {
            let v = s.sample(&mut rng).unwrap();
            assert!((0.1..=0.5).contains(&v));
        }
    }

    #[test]
    fn choice_draws_from_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = vec![0.6, 0.65, 0.7];
        let s = Sampler::Choice(values.clone());
        for _ in 0..20 {
            let v = s.sample(&mut rng).unwrap();
            assert!(values.contains(&v));
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(
            Sampler::Uniform {
                low: 1.0,
                high: 0.0
            }
            .validate()
            .is_err()
        );
        assert!(
            Sampler::Triangular {
                low: 0.5,
                mode: 0.1,
                high: 1.0
            }
            .validate()
            .is_err()
        );
        assert!(Sampler::Choice(vec![]).validate().is_err());
        assert!(
            Sampler::Normal {
                mean: 0.0,
                std_dev: -1.0
            }
            .validate()
            .is_err()
        );
    }
}
