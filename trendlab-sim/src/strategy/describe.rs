//! Strategy description boundary.
//!
//! A minimal structured form of a configured strategy: its parameter values,
//! the indicators it reads and the boolean entry/exit conditions, expressed
//! over indicator keys and price fields with explicit bar offsets. External
//! code generators translate this into another scripting environment.
//!
//! Offsets are `bars_ago`: 0 is the bar being evaluated, 1 the bar before.
//! Indicator keys come from the same indicator constructors the strategies
//! use, so a description always names the series its strategy reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MaType, ParamValue, Strategy, StrategyParams, VotingMethod};
use crate::error::ConfigError;
use crate::indicators::{
    Donchian, Indicator, ParabolicSar, Roc, SarOutput, Supertrend, SupertrendOutput,
};

fn ma_key(ma_type: MaType, period: usize) -> String {
    ma_type.indicator(period).name().to_string()
}

fn roc_key(lookback: usize) -> String {
    Roc::new(lookback).name().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDescription {
    pub strategy_id: String,
    pub config_id: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub indicators: Vec<IndicatorDef>,
    pub entry: Condition,
    pub exit: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDef {
    pub key: String,
    pub kind: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl IndicatorDef {
    fn new(key: impl Into<String>, kind: &str, params: &[(&str, ParamValue)]) -> Self {
        Self {
            key: key.into(),
            kind: kind.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operand {
    Indicator { key: String, bars_ago: usize },
    Price { field: PriceField, bars_ago: usize },
    Constant { value: f64 },
}

impl Operand {
    fn ind(key: &str, bars_ago: usize) -> Self {
        Operand::Indicator {
            key: key.to_string(),
            bars_ago,
        }
    }

    fn close() -> Self {
        Operand::Price {
            field: PriceField::Close,
            bars_ago: 0,
        }
    }

    fn constant(value: f64) -> Self {
        Operand::Constant { value }
    }
}

/// Boolean rule over operands. Comparisons involving an undefined operand are false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Greater { left: Operand, right: Operand },
    Less { left: Operand, right: Operand },
    LessOrEqual { left: Operand, right: Operand },
    /// `left[1] <= right[1] && left[0] > right[0]`
    CrossAbove { left: Operand, right: Operand },
    /// `left[1] > right[1] && left[0] <= right[0]`
    CrossBelow { left: Operand, right: Operand },
    All { of: Vec<Condition> },
    Any { of: Vec<Condition> },
    AtLeast { count: usize, of: Vec<Condition> },
    /// Sum of weights of true terms strictly greater than half the total weight.
    WeightedMajority { terms: Vec<WeightedCondition> },
    /// True on exactly the listed bar indices.
    AtBar { indices: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCondition {
    pub weight: f64,
    pub condition: Condition,
}

/// Entry, exit and the long/flat stance conditions of one strategy.
struct Rules {
    entry: Condition,
    exit: Condition,
    long: Option<Condition>,
    flat: Option<Condition>,
}

impl StrategyParams {
    /// Describe a configuration. Parameters are validated first, so an
    /// out-of-domain value is an error rather than a panic.
    pub fn describe(&self) -> Result<StrategyDescription, ConfigError> {
        self.validate()?;
        let rules = self.rules();
        Ok(StrategyDescription {
            strategy_id: self.strategy_id().to_string(),
            config_id: self.fingerprint(),
            parameters: self.parameters(),
            indicators: self.indicator_defs(),
            entry: rules.entry,
            exit: rules.exit,
        })
    }

    fn indicator_defs(&self) -> Vec<IndicatorDef> {
        let mut defs = match self {
            StrategyParams::MaCrossover {
                fast,
                slow,
                ma_type,
            } => {
                let kind = ma_type.prefix();
                vec![
                    IndicatorDef::new(ma_key(*ma_type, *fast), kind, &[("period", ParamValue::from(*fast))]),
                    IndicatorDef::new(ma_key(*ma_type, *slow), kind, &[("period", ParamValue::from(*slow))]),
                ]
            }
            StrategyParams::ChannelBreakout {
                entry_lookback,
                exit_lookback,
            } => vec![
                IndicatorDef::new(
                    Donchian::upper(*entry_lookback).name(),
                    "donchian_upper",
                    &[("period", ParamValue::from(*entry_lookback))],
                ),
                IndicatorDef::new(
                    Donchian::lower(*exit_lookback).name(),
                    "donchian_lower",
                    &[("period", ParamValue::from(*exit_lookback))],
                ),
            ],
            StrategyParams::SupertrendFlip {
                atr_period,
                multiplier,
            } => {
                let params: [(&str, ParamValue); 2] = [
                    ("atr_period", (*atr_period).into()),
                    ("multiplier", (*multiplier).into()),
                ];
                vec![
                    IndicatorDef::new(
                        Supertrend::new(*atr_period, *multiplier, SupertrendOutput::Direction).name(),
                        "supertrend_direction",
                        &params,
                    ),
                    IndicatorDef::new(
                        Supertrend::new(*atr_period, *multiplier, SupertrendOutput::Level).name(),
                        "supertrend",
                        &params,
                    ),
                ]
            }
            StrategyParams::ParabolicSarFlip {
                af_start,
                af_step,
                af_max,
            } => {
                let params: [(&str, ParamValue); 3] = [
                    ("af_start", (*af_start).into()),
                    ("af_step", (*af_step).into()),
                    ("af_max", (*af_max).into()),
                ];
                vec![
                    IndicatorDef::new(
                        ParabolicSar::new(*af_start, *af_step, *af_max, SarOutput::Direction).name(),
                        "psar_direction",
                        &params,
                    ),
                    IndicatorDef::new(
                        ParabolicSar::new(*af_start, *af_step, *af_max, SarOutput::Level).name(),
                        "psar",
                        &params,
                    ),
                ]
            }
            StrategyParams::Momentum { lookback, .. } => vec![IndicatorDef::new(
                roc_key(*lookback),
                "roc",
                &[("period", ParamValue::from(*lookback))],
            )],
            StrategyParams::Ensemble { members, .. } => {
                members.iter().flat_map(|m| m.indicator_defs()).collect()
            }
            StrategyParams::FixedSchedule { .. } => Vec::new(),
        };
        // Members may share indicators.
        let mut seen = std::collections::BTreeSet::new();
        defs.retain(|d| seen.insert(d.key.clone()));
        defs
    }

    fn rules(&self) -> Rules {
        match self {
            StrategyParams::MaCrossover {
                fast,
                slow,
                ma_type,
            } => {
                let f = ma_key(*ma_type, *fast);
                let s = ma_key(*ma_type, *slow);
                Rules {
                    entry: Condition::CrossAbove {
                        left: Operand::ind(&f, 0),
                        right: Operand::ind(&s, 0),
                    },
                    exit: Condition::CrossBelow {
                        left: Operand::ind(&f, 0),
                        right: Operand::ind(&s, 0),
                    },
                    long: Some(Condition::Greater {
                        left: Operand::ind(&f, 0),
                        right: Operand::ind(&s, 0),
                    }),
                    flat: Some(Condition::LessOrEqual {
                        left: Operand::ind(&f, 0),
                        right: Operand::ind(&s, 0),
                    }),
                }
            }
            StrategyParams::ChannelBreakout {
                entry_lookback,
                exit_lookback,
            } => {
                let entry = Condition::Greater {
                    left: Operand::close(),
                    right: Operand::ind(Donchian::upper(*entry_lookback).name(), 1),
                };
                let exit = Condition::Less {
                    left: Operand::close(),
                    right: Operand::ind(Donchian::lower(*exit_lookback).name(), 1),
                };
                Rules {
                    long: Some(entry.clone()),
                    flat: Some(exit.clone()),
                    entry,
                    exit,
                }
            }
            StrategyParams::SupertrendFlip {
                atr_period,
                multiplier,
            } => direction_flip_rules(
                Supertrend::new(*atr_period, *multiplier, SupertrendOutput::Direction).name(),
            ),
            StrategyParams::ParabolicSarFlip {
                af_start,
                af_step,
                af_max,
            } => direction_flip_rules(
                ParabolicSar::new(*af_start, *af_step, *af_max, SarOutput::Direction).name(),
            ),
            StrategyParams::Momentum {
                lookback,
                entry_threshold,
                exit_threshold,
            } => {
                let key = roc_key(*lookback);
                let entry = Condition::Greater {
                    left: Operand::ind(&key, 0),
                    right: Operand::constant(*entry_threshold),
                };
                let exit = Condition::Less {
                    left: Operand::ind(&key, 0),
                    right: Operand::constant(*exit_threshold),
                };
                Rules {
                    long: Some(entry.clone()),
                    flat: Some(exit.clone()),
                    entry,
                    exit,
                }
            }
            StrategyParams::Ensemble { members, voting } => ensemble_rules(members, *voting),
            StrategyParams::FixedSchedule { entries, exits } => Rules {
                entry: Condition::AtBar {
                    indices: entries.clone(),
                },
                exit: Condition::AtBar {
                    indices: exits.clone(),
                },
                long: None,
                flat: None,
            },
        }
    }
}

fn direction_flip_rules(direction_key: &str) -> Rules {
    let dir = || Operand::ind(direction_key, 0);
    let zero = || Operand::constant(0.0);
    Rules {
        entry: Condition::CrossAbove {
            left: dir(),
            right: zero(),
        },
        exit: Condition::CrossBelow {
            left: dir(),
            right: zero(),
        },
        long: Some(Condition::Greater {
            left: dir(),
            right: zero(),
        }),
        flat: Some(Condition::Less {
            left: dir(),
            right: zero(),
        }),
    }
}

fn ensemble_rules(members: &[StrategyParams], voting: VotingMethod) -> Rules {
    let member_rules: Vec<Rules> = members.iter().map(|m| m.rules()).collect();
    let longs: Vec<Condition> = member_rules.iter().filter_map(|r| r.long.clone()).collect();
    let flats: Vec<Condition> = member_rules.iter().filter_map(|r| r.flat.clone()).collect();

    let (entry, exit) = match voting {
        VotingMethod::Majority => {
            let count = members.len() / 2 + 1;
            (
                Condition::AtLeast { count, of: longs },
                Condition::AtLeast { count, of: flats },
            )
        }
        VotingMethod::WeightedByHorizon => {
            // Members are validated by `describe` before rules are derived.
            let weights: Vec<f64> = members
                .iter()
                .map(|m| m.build().warmup().max(1) as f64)
                .collect();
            let weigh = |conds: Vec<Condition>| Condition::WeightedMajority {
                terms: conds
                    .into_iter()
                    .zip(&weights)
                    .map(|(condition, &weight)| WeightedCondition { weight, condition })
                    .collect(),
            };
            (weigh(longs), weigh(flats))
        }
        VotingMethod::UnanimousEntry => (Condition::All { of: longs }, Condition::Any { of: flats }),
    };
    Rules {
        long: Some(entry.clone()),
        flat: Some(exit.clone()),
        entry,
        exit,
    }
}
