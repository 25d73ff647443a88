//! Weighted overall confidence

use crate::policy::TierWeights;
use crate::validators::ValidationResult;

/// Σ weight × confidence over the five tiers, in 0..=100.
///
/// Computed in integer basis points and divided once, so the result is the
/// same whatever order the tiers were evaluated in. Placeholders count as 0.
pub fn aggregate(results: &[ValidationResult; 5], weights: &TierWeights) -> f64 {
    let basis_points = weights.basis_points();
    let total: u64 = results
        .iter()
        .map(|r| u64::from(r.confidence) * u64::from(basis_points[r.tier().index()]))
        .sum();
    total as f64 / f64::from(TierWeights::total_basis_points())
}
