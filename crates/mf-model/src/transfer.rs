//! Transfer specs: stochastic directed edges between compartments.

use mf_core::Real;
use mf_dist::{DistError, Sampler};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{ModelError, ModelResult};

/// One sampled period entry of a period-defined transfer.
///
/// Each period carries its own sampling distribution and its own priority;
/// the priority feeds the normalization order for that period only.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTc {
    pub sampler: Sampler,
    pub priority: i32,
}

/// How a transfer coefficient is determined each period.
///
/// A closed enumeration matched exhaustively; there is no open-ended
/// dispatch on transfer type.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferKind {
    /// Deterministic coefficient.
    Constant(Real),
    /// Fresh draw from a probability distribution each period.
    Stochastic(Sampler),
    /// Uniform draw from an explicit sample of plausible coefficients.
    RandomChoice(Vec<Real>),
    /// Weighted mixture: pick one partial distribution by weight, then draw
    /// from it.
    Aggregated {
        parts: Vec<Sampler>,
        weights: Option<Vec<Real>>,
    },
    /// A separate distribution and priority for every period.
    PeriodDefined(Vec<PeriodTc>),
}

/// A directed edge from a compartment to a named target.
///
/// `priority` orders which coefficients absorb the correction first when the
/// outgoing set is normalized to sum 1 (lower = less credible = adjusted
/// first). For period-defined transfers the per-period priority applies.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSpec {
    pub target: String,
    pub priority: i32,
    pub kind: TransferKind,
}

impl TransferSpec {
    pub fn constant(target: impl Into<String>, value: Real, priority: i32) -> Self {
        Self {
            target: target.into(),
            priority,
            kind: TransferKind::Constant(value),
        }
    }

    pub fn stochastic(target: impl Into<String>, sampler: Sampler, priority: i32) -> Self {
        Self {
            target: target.into(),
            priority,
            kind: TransferKind::Stochastic(sampler),
        }
    }

    pub fn random_choice(target: impl Into<String>, sample: Vec<Real>, priority: i32) -> Self {
        Self {
            target: target.into(),
            priority,
            kind: TransferKind::RandomChoice(sample),
        }
    }

    /// Check the spec is well-formed (a configuration error here must
    /// surface before any simulation work starts).
    pub fn validate(&self) -> ModelResult<()> {
        match &self.kind {
            TransferKind::Constant(_) => Ok(()),
            TransferKind::Stochastic(sampler) => {
                sampler
                    .validate()
                    .map_err(|source| ModelError::TransferDistribution {
                        target: self.target.clone(),
                        source,
                    })
            }
            TransferKind::RandomChoice(sample) => {
                if sample.is_empty() {
                    return Err(ModelError::TransferDistribution {
                        target: self.target.clone(),
                        source: DistError::EmptySample { what: "choice" },
                    });
                }
                Ok(())
            }
            TransferKind::Aggregated { parts, weights } => {
                if parts.is_empty() {
                    return Err(ModelError::EmptyAggregatedTransfer {
                        target: self.target.clone(),
                    });
                }
                if let Some(w) = weights {
                    if w.len() != parts.len() {
                        return Err(ModelError::AggregatedWeightMismatch {
                            target: self.target.clone(),
                            parts: parts.len(),
                            weights: w.len(),
                        });
                    }
                    if w.iter().sum::<Real>() <= 0.0 {
                        return Err(ModelError::TransferDistribution {
                            target: self.target.clone(),
                            source: DistError::InvalidParameters {
                                what: "aggregated weights",
                                details: "weights must sum to a positive value".to_string(),
                            },
                        });
                    }
                }
                for part in parts {
                    part.validate()
                        .map_err(|source| ModelError::TransferDistribution {
                            target: self.target.clone(),
                            source,
                        })?;
                }
                Ok(())
            }
            TransferKind::PeriodDefined(entries) => {
                if entries.is_empty() {
                    return Err(ModelError::EmptyPeriodTransfer {
                        target: self.target.clone(),
                    });
                }
                for entry in entries {
                    entry.sampler.validate().map_err(|source| {
                        ModelError::TransferDistribution {
                            target: self.target.clone(),
                            source,
                        }
                    })?;
                }
                Ok(())
            }
        }
    }

    /// Sample a transfer coefficient for one period.
    ///
    /// Returns the coefficient and the priority in effect for this period
    /// (period-defined transfers override the edge priority per period).
    pub fn sample_tc<R: Rng + ?Sized>(
        &self,
        period: usize,
        rng: &mut R,
    ) -> ModelResult<(Real, i32)> {
        match &self.kind {
            TransferKind::Constant(value) => Ok((*value, self.priority)),
            TransferKind::Stochastic(sampler) => Ok((sampler.sample(rng)?, self.priority)),
            TransferKind::RandomChoice(sample) => sample
                .choose(rng)
                .copied()
                .map(|tc| (tc, self.priority))
                .ok_or_else(|| ModelError::TransferDistribution {
                    target: self.target.clone(),
                    source: DistError::EmptySample { what: "choice" },
                }),
            TransferKind::Aggregated { parts, weights } => {
                let part = pick_weighted(parts, weights.as_deref(), rng);
                Ok((part.sample(rng)?, self.priority))
            }
            TransferKind::PeriodDefined(entries) => {
                let entry =
                    entries
                        .get(period)
                        .ok_or_else(|| ModelError::TransferPeriodOutOfRange {
                            target: self.target.clone(),
                            period,
                            len: entries.len(),
                        })?;
                Ok((entry.sampler.sample(rng)?, entry.priority))
            }
        }
    }
}

/// Pick one part by cumulative weight (uniform weights when none given).
fn pick_weighted<'a, R: Rng + ?Sized>(
    parts: &'a [Sampler],
    weights: Option<&[Real]>,
    rng: &mut R,
) -> &'a Sampler {
    let total: Real = match weights {
        Some(w) => w.iter().sum(),
        None => parts.len() as Real,
    };
    if total <= 0.0 {
        return parts.first().expect("parts validated non-empty");
    }
    let threshold = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, part) in parts.iter().enumerate() {
        cumulative += weights.map_or(1.0, |w| w[i]);
        if threshold < cumulative {
            return part;
        }
    }
    // threshold == total can only be approached, not reached
    parts.last().expect("parts validated non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn constant_transfer_samples_its_value() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = TransferSpec::constant("soil", 0.4, 2);
        assert_eq!(t.sample_tc(0, &mut rng).unwrap(), (0.4, 2));
        assert_eq!(t.sample_tc(17, &mut rng).unwrap(), (0.4, 2));
    }

    #[test]
    fn period_defined_overrides_priority() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = TransferSpec {
            target: "water".into(),
            priority: 1,
            kind: TransferKind::PeriodDefined(vec![
                PeriodTc {
                    sampler: Sampler::Fixed(0.2),
                    priority: 5,
                },
                PeriodTc {
                    sampler: Sampler::Fixed(0.8),
                    priority: 7,
                },
            ]),
        };
        assert_eq!(t.sample_tc(0, &mut rng).unwrap(), (0.2, 5));
        assert_eq!(t.sample_tc(1, &mut rng).unwrap(), (0.8, 7));
    }

    #[test]
    fn period_defined_out_of_range_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = TransferSpec {
            target: "water".into(),
            priority: 1,
            kind: TransferKind::PeriodDefined(vec![PeriodTc {
                sampler: Sampler::Fixed(0.2),
                priority: 1,
            }]),
        };
        let err = t.sample_tc(1, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ModelError::TransferPeriodOutOfRange { period: 1, len: 1, .. }
        ));
    }

    #[test]
    fn aggregated_draws_from_parts() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = TransferSpec {
            target: "air".into(),
            priority: 1,
            kind: TransferKind::Aggregated {
                parts: vec![Sampler::Fixed(0.1), Sampler::Fixed(0.9)],
                weights: Some(vec![1.0, 3.0]),
            },
        };
        for _ in 0..20 {
            let (tc, _) = t.sample_tc(0, &mut rng).unwrap();
            assert!(tc == 0.1 || tc == 0.9);
        }
    }

    #[test]
    fn aggregated_weight_mismatch_rejected() {
        let t = TransferSpec {
            target: "air".into(),
            priority: 1,
            kind: TransferKind::Aggregated {
                parts: vec![Sampler::Fixed(0.1)],
                weights: Some(vec![1.0, 2.0]),
            },
        };
        assert!(matches!(
            t.validate().unwrap_err(),
            ModelError::AggregatedWeightMismatch { .. }
        ));
    }
}
