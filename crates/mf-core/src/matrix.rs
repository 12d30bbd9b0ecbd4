//! Dense runs x periods record matrices.
//!
//! Every logged quantity in a simulation (inflows, outflows, inventories,
//! scheduled releases) lives in one of these: allocated once at setup to its
//! final size and never resized. Rows are runs, columns are periods, so a
//! single Monte-Carlo run owns exactly one row and runs can be written
//! independently.

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;

/// Fixed-size runs x periods matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPeriodMatrix {
    runs: usize,
    periods: usize,
    data: Vec<Real>,
}

impl RunPeriodMatrix {
    /// Allocate a zeroed matrix.
    pub fn zeros(runs: usize, periods: usize) -> Self {
        Self {
            runs,
            periods,
            data: vec![0.0; runs * periods],
        }
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn periods(&self) -> usize {
        self.periods
    }

    #[inline]
    fn offset(&self, run: usize, period: usize) -> usize {
        debug_assert!(run < self.runs && period < self.periods);
        run * self.periods + period
    }

    #[inline]
    pub fn get(&self, run: usize, period: usize) -> Real {
        self.data[self.offset(run, period)]
    }

    #[inline]
    pub fn set(&mut self, run: usize, period: usize, value: Real) {
        let i = self.offset(run, period);
        self.data[i] = value;
    }

    /// Accumulate into one cell.
    #[inline]
    pub fn add(&mut self, run: usize, period: usize, value: Real) {
        let i = self.offset(run, period);
        self.data[i] += value;
    }

    /// One run's trajectory over all periods.
    pub fn row(&self, run: usize) -> &[Real] {
        let start = run * self.periods;
        &self.data[start..start + self.periods]
    }

    pub fn row_mut(&mut self, run: usize) -> &mut [Real] {
        let start = run * self.periods;
        &mut self.data[start..start + self.periods]
    }

    /// Copy a full run row in (used when merging per-run results).
    pub fn set_row(&mut self, run: usize, values: &[Real]) -> CoreResult<()> {
        if values.len() != self.periods {
            return Err(CoreError::IndexOob {
                what: "run row length",
                index: values.len(),
                len: self.periods,
            });
        }
        self.row_mut(run).copy_from_slice(values);
        Ok(())
    }

    /// Elementwise addition of another matrix of the same shape.
    pub fn add_matrix(&mut self, other: &RunPeriodMatrix) -> CoreResult<()> {
        if self.runs != other.runs || self.periods != other.periods {
            return Err(CoreError::InvalidArg {
                what: "matrix shapes differ",
            });
        }
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// Mean over runs for each period.
    pub fn mean_per_period(&self) -> Vec<Real> {
        let mut means = vec![0.0; self.periods];
        if self.runs == 0 {
            return means;
        }
        for run in 0..self.runs {
            for (period, m) in means.iter_mut().enumerate() {
                *m += self.get(run, period);
            }
        }
        for m in &mut means {
            *m /= self.runs as Real;
        }
        means
    }

    /// Median over runs for each period.
    pub fn median_per_period(&self) -> Vec<Real> {
        self.percentile_per_period(50.0)
    }

    /// Percentile over runs for each period, with linear interpolation
    /// between closest ranks (numpy's default behavior, which the original
    /// result tables were produced with).
    pub fn percentile_per_period(&self, percentile: Real) -> Vec<Real> {
        let mut out = vec![0.0; self.periods];
        if self.runs == 0 {
            return out;
        }
        let p = percentile.clamp(0.0, 100.0);
        let mut column = vec![0.0; self.runs];
        for (period, o) in out.iter_mut().enumerate() {
            for (run, c) in column.iter_mut().enumerate() {
                *c = self.get(run, period);
            }
            column.sort_by(|a, b| a.total_cmp(b));
            let rank = p / 100.0 * (self.runs - 1) as Real;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as Real;
            *o = column[lo] + (column[hi] - column[lo]) * frac;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_shape_and_access() {
        let mut m = RunPeriodMatrix::zeros(2, 3);
        assert_eq!(m.runs(), 2);
        assert_eq!(m.periods(), 3);
        m.set(1, 2, 4.5);
        m.add(1, 2, 0.5);
        assert_eq!(m.get(1, 2), 5.0);
        assert_eq!(m.row(0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn set_row_rejects_bad_length() {
        let mut m = RunPeriodMatrix::zeros(2, 3);
        assert!(m.set_row(0, &[1.0, 2.0]).is_err());
        assert!(m.set_row(0, &[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(m.get(0, 1), 2.0);
    }

    #[test]
    fn per_period_stats() {
        let mut m = RunPeriodMatrix::zeros(4, 2);
        for (run, v) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            m.set(run, 0, *v);
            m.set(run, 1, 10.0 * *v);
        }
        assert_eq!(m.mean_per_period(), vec![2.5, 25.0]);
        assert_eq!(m.median_per_period(), vec![2.5, 25.0]);
        assert_eq!(m.percentile_per_period(0.0), vec![1.0, 10.0]);
        assert_eq!(m.percentile_per_period(100.0), vec![4.0, 40.0]);
        // 25th percentile of [1,2,3,4] with linear interpolation
        assert_eq!(m.percentile_per_period(25.0)[0], 1.75);
    }

    #[test]
    fn matrix_sum() {
        let mut a = RunPeriodMatrix::zeros(1, 2);
        let mut b = RunPeriodMatrix::zeros(1, 2);
        a.set(0, 0, 1.0);
        b.set(0, 0, 2.0);
        b.set(0, 1, 3.0);
        a.add_matrix(&b).unwrap();
        assert_eq!(a.row(0), &[3.0, 3.0]);

        let c = RunPeriodMatrix::zeros(2, 2);
        assert!(a.add_matrix(&c).is_err());
    }
}
