//! Transfer-coefficient normalization.
//!
//! After sampling, a compartment's outgoing coefficients must form a
//! probability simplex: nonnegative and summing to exactly 1. Sampled values
//! are estimates of differing credibility, so the correction is absorbed in
//! ascending priority order: the least trusted coefficients move first, and
//! a coefficient is never pushed below zero.

use mf_core::{Real, round_decimals};

/// Decimal digits at which the running sum is compared against 1.
const SUM_DIGITS: u32 = 11;

fn rounded_sum(tcs: &[Real]) -> Real {
    round_decimals(tcs.iter().sum(), SUM_DIGITS)
}

/// Adjust `tcs` in place so they sum to 1, consuming priority tiers in
/// ascending order.
///
/// Per tier:
/// - a total sum of 0 distributes 1/N uniformly over all coefficients;
/// - a zero-valued tier fills the shortfall `1 - sum` uniformly within the
///   tier (only when the sum is below 1);
/// - otherwise the tier is rescaled to `max(tier_sum - (sum - 1), 0)`, so
///   the tier absorbs the excess but never goes negative.
///
/// Any shortfall surviving all tiers is spread uniformly over all
/// coefficients, mirroring the zero-sum rule.
pub fn adjust_tcs(tcs: &mut [Real], priorities: &[i32]) {
    debug_assert_eq!(tcs.len(), priorities.len());
    if tcs.is_empty() {
        return;
    }

    let mut tiers: Vec<i32> = priorities.to_vec();
    tiers.sort_unstable();
    tiers.dedup();

    let mut tc_sum = rounded_sum(tcs);
    for &tier in &tiers {
        if tc_sum == 1.0 {
            return;
        }
        if tc_sum == 0.0 {
            let uniform = 1.0 / tcs.len() as Real;
            tcs.fill(uniform);
        } else {
            let group: Vec<usize> = (0..tcs.len()).filter(|&i| priorities[i] == tier).collect();
            let tier_sum: Real = group.iter().map(|&i| tcs[i]).sum();
            if tier_sum == 0.0 {
                if tc_sum < 1.0 {
                    let fill = (1.0 - tc_sum) / group.len() as Real;
                    for &i in &group {
                        tcs[i] = fill;
                    }
                }
            } else {
                let norm_to = (tier_sum - (tc_sum - 1.0)).max(0.0);
                let scale = norm_to / tier_sum;
                for &i in &group {
                    tcs[i] *= scale;
                }
            }
        }
        tc_sum = rounded_sum(tcs);
    }

    if tc_sum < 1.0 {
        // every tier was exhausted at zero; only a uniform fill remains
        let fill = (1.0 - tc_sum) / tcs.len() as Real;
        for tc in tcs.iter_mut() {
            *tc += fill;
        }
    }
}
