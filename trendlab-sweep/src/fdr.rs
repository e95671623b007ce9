//! Benjamini-Hochberg false-discovery-rate control.
//!
//! Given m p-values sorted ascending, the adjusted value of rank k is
//! `min(p_(k) * m / k, adjusted_(k+1))`, clamped to 1. A hypothesis is
//! significant when its adjusted p-value is at or below alpha, which is the
//! same as rejecting every p at or below the largest `p_(k) <= k/m * alpha`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdrResult {
    pub id: String,
    pub raw_p: f64,
    pub adjusted_p: f64,
    pub significant: bool,
}

/// Adjusted p-values, returned in the input order. Non-finite p-values are
/// treated as 1.0.
pub fn benjamini_hochberg(p_values: &[(String, f64)], alpha: f64) -> Vec<FdrResult> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let clean = |p: f64| if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 };
    let mut order: Vec<usize> = (0..m).collect();
    // Stable, so equal p-values keep input order.
    order.sort_by(|&a, &b| clean(p_values[a].1).total_cmp(&clean(p_values[b].1)));

    let mut adjusted = vec![1.0; m];
    let mut running = 1.0_f64;
    for (rank0, &i) in order.iter().enumerate().rev() {
        let corrected = clean(p_values[i].1) * m as f64 / (rank0 + 1) as f64;
        running = running.min(corrected).min(1.0);
        adjusted[i] = running;
    }

    p_values
        .iter()
        .zip(adjusted)
        .map(|((id, p), adjusted_p)| FdrResult {
            id: id.clone(),
            raw_p: *p,
            adjusted_p,
            significant: adjusted_p <= alpha,
        })
        .collect()
}
