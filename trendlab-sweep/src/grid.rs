//! Parameter grids: named axes, constraint predicates, deterministic expansion.
//!
//! Expansion is the cross product of the axes in declaration order, first axis
//! outermost, filtered by every constraint. The same grid always yields the
//! same points in the same order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trendlab_sim::strategy::ParamValue;
use trendlab_sim::ConfigError;

/// Values of one grid point keyed by axis name.
pub type GridPoint = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub values: Vec<ParamValue>,
}

impl Axis {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<ParamValue>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// Two-character operators first so `<=` is not read as `<`.
    const TOKENS: [(&'static str, CmpOp); 6] = [
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }

    fn holds_f64(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Axis(String),
    Number(f64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Axis(name) => f.write_str(name),
            Operand::Number(v) => write!(f, "{v}"),
        }
    }
}

/// `<axis> <op> <axis|number>`, e.g. `fast < slow` or `multiplier >= 1.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Constraint {
    pub left: String,
    pub op: CmpOp,
    pub right: Operand,
}

impl Constraint {
    /// Whether the point satisfies the predicate. Text values only support
    /// `==` and `!=`; any other comparison involving text is false.
    pub fn holds(&self, point: &GridPoint) -> bool {
        let Some(left) = point.get(&self.left) else {
            return false;
        };
        let right = match &self.right {
            Operand::Number(v) => ParamValue::Float(*v),
            Operand::Axis(name) => match point.get(name) {
                Some(v) => v.clone(),
                None => return false,
            },
        };
        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => self.op.holds_f64(a, b),
            _ => match self.op {
                CmpOp::Eq => left.to_string() == right.to_string(),
                CmpOp::Ne => left.to_string() != right.to_string(),
                _ => false,
            },
        }
    }

    fn axes(&self) -> impl Iterator<Item = &str> {
        let right = match &self.right {
            Operand::Axis(name) => Some(name.as_str()),
            Operand::Number(_) => None,
        };
        std::iter::once(self.left.as_str()).chain(right)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl FromStr for Constraint {
    type Err = ConfigError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| ConfigError::Constraint {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let (at, token, op) = (0..expr.len())
            .filter(|&i| expr.is_char_boundary(i))
            .find_map(|i| {
                CmpOp::TOKENS
                    .iter()
                    .find(|(tok, _)| expr[i..].starts_with(tok))
                    .map(|&(tok, op)| (i, tok, op))
            })
            .ok_or_else(|| fail("no comparison operator"))?;

        let left = expr[..at].trim();
        let right = expr[at + token.len()..].trim();
        if !is_identifier(left) {
            return Err(fail("left side must be an axis name"));
        }
        let right = if let Ok(v) = right.parse::<f64>() {
            if !v.is_finite() {
                return Err(fail("right side must be finite"));
            }
            Operand::Number(v)
        } else if is_identifier(right) {
            Operand::Axis(right.to_string())
        } else {
            return Err(fail("right side must be an axis name or a number"));
        };

        Ok(Constraint {
            left: left.to_string(),
            op,
            right,
        })
    }
}

impl TryFrom<String> for Constraint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Constraint> for String {
    fn from(c: Constraint) -> Self {
        c.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    pub axes: Vec<Axis>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl ParamGrid {
    /// Checks that every axis is non-empty and unique and that constraints
    /// only name declared axes.
    pub fn new(axes: Vec<Axis>, constraints: Vec<Constraint>) -> Result<Self, ConfigError> {
        let grid = Self { axes, constraints };
        grid.check()?;
        Ok(grid)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        for (i, axis) in self.axes.iter().enumerate() {
            if axis.values.is_empty() || self.axes[..i].iter().any(|a| a.name == axis.name) {
                return Err(ConfigError::Axis(axis.name.clone()));
            }
        }
        for constraint in &self.constraints {
            if let Some(missing) = constraint
                .axes()
                .find(|name| !self.axes.iter().any(|a| a.name == *name))
            {
                return Err(ConfigError::Constraint {
                    expr: constraint.to_string(),
                    reason: format!("unknown axis `{missing}`"),
                });
            }
        }
        Ok(())
    }

    /// Size of the unfiltered cross product.
    pub fn cardinality(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Every point passing all constraints, in lexicographic axis order.
    pub fn expand(&self) -> Vec<GridPoint> {
        let total = self.cardinality();
        let mut points = Vec::new();
        let mut digits = vec![0usize; self.axes.len()];
        for _ in 0..total {
            let point: GridPoint = self
                .axes
                .iter()
                .zip(&digits)
                .map(|(axis, &d)| (axis.name.clone(), axis.values[d].clone()))
                .collect();
            if self.constraints.iter().all(|c| c.holds(&point)) {
                points.push(point);
            }
            // Odometer increment, last axis fastest.
            for (slot, axis) in digits.iter_mut().zip(&self.axes).rev() {
                *slot += 1;
                if *slot < axis.values.len() {
                    break;
                }
                *slot = 0;
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ma_grid() -> ParamGrid {
        ParamGrid::new(
            vec![
                Axis::new("fast", [5usize, 10, 20]),
                Axis::new("slow", [10usize, 20, 50]),
            ],
            vec!["fast < slow".parse().unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn parses_operators() {
        let c: Constraint = "fast<=slow".parse().unwrap();
        assert_eq!(c.op, CmpOp::Le);
        assert_eq!(c.right, Operand::Axis("slow".into()));

        let c: Constraint = "multiplier >= 1.5".parse().unwrap();
        assert_eq!(c.op, CmpOp::Ge);
        assert_eq!(c.right, Operand::Number(1.5));

        let c: Constraint = " a != b ".parse().unwrap();
        assert_eq!(c.to_string(), "a != b");
    }

    #[test]
    fn rejects_malformed_constraints() {
        for bad in ["fast slow", "< slow", "1 < slow", "fast < ", "fast < a b"] {
            assert!(
                matches!(bad.parse::<Constraint>(), Err(ConfigError::Constraint { .. })),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn expansion_is_ordered_and_filtered() {
        let points = ma_grid().expand();
        let pairs: Vec<(String, String)> = points
            .iter()
            .map(|p| (p["fast"].to_string(), p["slow"].to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("5".into(), "10".into()),
                ("5".into(), "20".into()),
                ("5".into(), "50".into()),
                ("10".into(), "20".into()),
                ("10".into(), "50".into()),
                ("20".into(), "50".into()),
            ]
        );
        assert_eq!(ma_grid().cardinality(), 9);
    }

    #[test]
    fn unknown_axis_in_constraint_is_an_error() {
        let err = ParamGrid::new(
            vec![Axis::new("fast", [5usize])],
            vec!["fast < slow".parse().unwrap()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Constraint { .. }));
    }

    #[test]
    fn empty_or_duplicate_axis_is_an_error() {
        let empty = ParamGrid::new(vec![Axis::new("fast", Vec::<usize>::new())], vec![]);
        assert!(matches!(empty, Err(ConfigError::Axis(_))));
        let dup = ParamGrid::new(
            vec![Axis::new("fast", [1usize]), Axis::new("fast", [2usize])],
            vec![],
        );
        assert!(matches!(dup, Err(ConfigError::Axis(_))));
    }

    #[test]
    fn text_axes_compare_by_equality() {
        let grid = ParamGrid::new(
            vec![
                Axis::new("ma_type", ["sma", "ema"]),
                Axis::new("fast", [5usize]),
            ],
            vec!["ma_type != sma".parse().unwrap()],
        );
        // `sma` on the right is read as an axis name and is not declared.
        assert!(grid.is_err());

        let grid = ParamGrid::new(vec![Axis::new("ma_type", ["sma", "ema"])], vec![]).unwrap();
        assert_eq!(grid.expand().len(), 2);
    }

    #[test]
    fn constraint_round_trips_through_serde() {
        let c: Constraint = serde_json::from_str("\"fast < slow\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"fast < slow\"");
        assert!(serde_json::from_str::<Constraint>("\"nonsense\"").is_err());
    }
}
