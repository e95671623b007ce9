//! Walk-forward letter grade from the out-of-sample / in-sample Sharpe ratio.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WalkForwardGrade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for WalkForwardGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WalkForwardGrade::A => "A",
            WalkForwardGrade::B => "B",
            WalkForwardGrade::C => "C",
            WalkForwardGrade::D => "D",
            WalkForwardGrade::F => "F",
        };
        f.write_str(s)
    }
}

/// Minimum OOS/IS ratio for each grade. Anything below `d` is F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// Below this mean in-sample Sharpe the ratio is meaningless and the
    /// grade is F.
    pub min_in_sample_sharpe: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: 0.8,
            b: 0.6,
            c: 0.4,
            d: 0.2,
            min_in_sample_sharpe: 0.1,
        }
    }
}

impl GradeThresholds {
    /// Ratio and grade. The ratio is `None` when in-sample Sharpe is below
    /// the minimum; a negative out-of-sample Sharpe gives a ratio of 0.
    pub fn grade(&self, in_sample_sharpe: f64, out_of_sample_sharpe: f64) -> (Option<f64>, WalkForwardGrade) {
        if !in_sample_sharpe.is_finite()
            || !out_of_sample_sharpe.is_finite()
            || in_sample_sharpe < self.min_in_sample_sharpe
        {
            return (None, WalkForwardGrade::F);
        }
        let ratio = (out_of_sample_sharpe / in_sample_sharpe).max(0.0);
        let grade = if ratio >= self.a {
            WalkForwardGrade::A
        } else if ratio >= self.b {
            WalkForwardGrade::B
        } else if ratio >= self.c {
            WalkForwardGrade::C
        } else if ratio >= self.d {
            WalkForwardGrade::D
        } else {
            WalkForwardGrade::F
        };
        (Some(ratio), grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_ratio_gives_better_grade() {
        let t = GradeThresholds::default();
        assert_eq!(t.grade(1.0, 0.9).1, WalkForwardGrade::A);
        assert_eq!(t.grade(1.0, 0.7).1, WalkForwardGrade::B);
        assert_eq!(t.grade(1.0, 0.5).1, WalkForwardGrade::C);
        assert_eq!(t.grade(1.0, 0.3).1, WalkForwardGrade::D);
        assert_eq!(t.grade(1.0, 0.1).1, WalkForwardGrade::F);
        assert!(WalkForwardGrade::A < WalkForwardGrade::F);
    }

    #[test]
    fn degenerate_in_sample_is_f() {
        let t = GradeThresholds::default();
        assert_eq!(t.grade(0.05, 2.0), (None, WalkForwardGrade::F));
        assert_eq!(t.grade(-1.0, 1.0), (None, WalkForwardGrade::F));
        assert_eq!(t.grade(f64::NAN, 1.0), (None, WalkForwardGrade::F));
    }

    #[test]
    fn failed_out_of_sample_clamps_to_zero() {
        let (ratio, grade) = GradeThresholds::default().grade(1.5, -0.5);
        assert_eq!(ratio, Some(0.0));
        assert_eq!(grade, WalkForwardGrade::F);
    }

    #[test]
    fn thresholds_are_configurable() {
        let strict = GradeThresholds {
            a: 1.0,
            ..GradeThresholds::default()
        };
        assert_eq!(strict.grade(1.0, 0.9).1, WalkForwardGrade::B);
    }
}
