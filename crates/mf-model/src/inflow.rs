//! External inflow sources.

use mf_core::Real;
use mf_dist::Sampler;
use rand::Rng;

use crate::error::ModelResult;

/// Per-period scaling applied to a function inflow's sampled base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InflowFunction {
    /// The base value every period.
    Constant,
    /// base + slope * period.
    LinearGrowth { slope: Real },
    /// base * factor^period.
    GeometricGrowth { factor: Real },
}

impl InflowFunction {
    fn value(&self, base: Real, period: usize) -> Real {
        match self {
            InflowFunction::Constant => base,
            InflowFunction::LinearGrowth { slope } => base + slope * period as Real,
            InflowFunction::GeometricGrowth { factor } => base * factor.powi(period as i32),
        }
    }
}

/// How the per-period inflow amounts are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum InflowKind {
    /// One (possibly uncertain) amount per period; zero beyond the list.
    List(Vec<Sampler>),
    /// A sampled base amount expanded over periods by a function.
    Function {
        basic: Sampler,
        function: InflowFunction,
    },
}

/// An external source of material entering the system at one target
/// compartment.
///
/// The derivation distribution models uncertainty about the overall inflow
/// level: it is sampled once per run and multiplies every period's amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalInflowSpec {
    pub target: String,
    pub start_delay: usize,
    pub derivation: Option<Sampler>,
    pub kind: InflowKind,
}

impl ExternalInflowSpec {
    pub fn list(target: impl Into<String>, values: Vec<Sampler>) -> Self {
        Self {
            target: target.into(),
            start_delay: 0,
            derivation: None,
            kind: InflowKind::List(values),
        }
    }

    pub fn fixed_list(target: impl Into<String>, values: &[Real]) -> Self {
        Self::list(target, values.iter().copied().map(Sampler::Fixed).collect())
    }

    pub fn function(
        target: impl Into<String>,
        basic: Sampler,
        function: InflowFunction,
    ) -> Self {
        Self {
            target: target.into(),
            start_delay: 0,
            derivation: None,
            kind: InflowKind::Function { basic, function },
        }
    }

    pub fn with_start_delay(mut self, start_delay: usize) -> Self {
        self.start_delay = start_delay;
        self
    }

    pub fn with_derivation(mut self, derivation: Sampler) -> Self {
        self.derivation = Some(derivation);
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if let Some(derivation) = &self.derivation {
            derivation.validate()?;
        }
        match &self.kind {
            InflowKind::List(values) => {
                for value in values {
                    value.validate()?;
                }
            }
            InflowKind::Function { basic, .. } => basic.validate()?,
        }
        Ok(())
    }

    /// Draw this run's inflow realization: every period amount plus the
    /// run-wide derivation factor.
    pub fn sample_for_run<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelResult<SampledInflow> {
        let derivation_factor = match &self.derivation {
            Some(derivation) => derivation.sample(rng)?,
            None => 1.0,
        };
        let values = match &self.kind {
            InflowKind::List(samplers) => {
                let mut values = Vec::with_capacity(samplers.len());
                for sampler in samplers {
                    values.push(sampler.sample(rng)?);
                }
                SampledValues::List(values)
            }
            InflowKind::Function { basic, function } => SampledValues::Function {
                base: basic.sample(rng)?,
                function: *function,
            },
        };
        Ok(SampledInflow {
            start_delay: self.start_delay,
            derivation_factor,
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SampledValues {
    List(Vec<Real>),
    Function { base: Real, function: InflowFunction },
}

/// One run's realization of an external inflow.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledInflow {
    start_delay: usize,
    derivation_factor: Real,
    values: SampledValues,
}

impl SampledInflow {
    /// Inflow amount for one period: zero before the start delay, the
    /// derived amount afterwards, negative results clamped to zero.
    pub fn current_inflow(&self, period: usize) -> Real {
        if period < self.start_delay {
            return 0.0;
        }
        let offset = period - self.start_delay;
        let raw = match &self.values {
            SampledValues::List(values) => values.get(offset).copied().unwrap_or(0.0),
            SampledValues::Function { base, function } => function.value(*base, offset),
        };
        (raw * self.derivation_factor).max(0.0)
    }
}
