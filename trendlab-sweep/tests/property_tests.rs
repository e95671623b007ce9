//! Property tests for the sweep layer.
//!
//! 1. Robustness score is monotone in mean and in dispersion
//! 2. BH adjusted p-values dominate raw ones and preserve their order
//! 3. Grid expansion yields exactly the cross product filtered by constraints

use proptest::prelude::*;
use trendlab_sweep::aggregate::robustness_score;
use trendlab_sweep::fdr::benjamini_hochberg;
use trendlab_sweep::{Axis, Constraint, ParamGrid};

proptest! {
    #[test]
    fn more_dispersion_never_scores_higher(
        mean in -5.0..5.0_f64,
        std in 0.0..10.0_f64,
        extra in 1e-6..10.0_f64,
    ) {
        let base = robustness_score(mean, std);
        let wider = robustness_score(mean, std + extra);
        if mean > 0.0 {
            prop_assert!(wider < base);
        } else if mean < 0.0 {
            prop_assert!(wider > base);
        } else {
            prop_assert_eq!(wider, base);
        }
    }

    #[test]
    fn higher_mean_always_scores_higher(
        mean in -5.0..5.0_f64,
        std in 0.0..10.0_f64,
        extra in 1e-6..10.0_f64,
    ) {
        prop_assert!(robustness_score(mean + extra, std) > robustness_score(mean, std));
    }

    #[test]
    fn bh_adjustment_is_monotone(p in prop::collection::vec(0.0..=1.0_f64, 1..60)) {
        let input: Vec<(String, f64)> =
            p.iter().enumerate().map(|(i, &v)| (format!("c{i}"), v)).collect();
        let out = benjamini_hochberg(&input, 0.05);
        prop_assert_eq!(out.len(), p.len());
        for (r, (id, raw)) in out.iter().zip(&input) {
            prop_assert_eq!(&r.id, id);
            prop_assert!(r.adjusted_p >= *raw - 1e-12);
            prop_assert!(r.adjusted_p <= 1.0);
            prop_assert_eq!(r.significant, r.adjusted_p <= 0.05);
        }
        for a in &out {
            for b in &out {
                if a.raw_p < b.raw_p {
                    prop_assert!(a.adjusted_p <= b.adjusted_p + 1e-12);
                }
            }
        }
    }

    #[test]
    fn expansion_matches_filtered_cross_product(
        fast in prop::collection::btree_set(1usize..50, 1..6),
        slow in prop::collection::btree_set(1usize..80, 1..6),
    ) {
        let fast: Vec<usize> = fast.into_iter().collect();
        let slow: Vec<usize> = slow.into_iter().collect();
        let grid = ParamGrid::new(
            vec![Axis::new("fast", fast.clone()), Axis::new("slow", slow.clone())],
            vec!["fast < slow".parse::<Constraint>().unwrap()],
        )
        .unwrap();
        prop_assert_eq!(grid.cardinality(), fast.len() * slow.len());

        let expected = fast
            .iter()
            .flat_map(|f| slow.iter().map(move |s| (*f, *s)))
            .filter(|(f, s)| f < s)
            .count();
        let points = grid.expand();
        prop_assert_eq!(points.len(), expected);
        for point in &points {
            let f = point["fast"].as_f64().unwrap();
            let s = point["slow"].as_f64().unwrap();
            prop_assert!(f < s);
        }
    }
}
