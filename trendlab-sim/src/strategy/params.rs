//! Strategy parameters: the serializable, validated description of one
//! strategy configuration.
//!
//! Every variant carries a small fixed set of numeric fields. `validate` is
//! the domain check that runs before scheduling, `build` turns a validated
//! value into an evaluator, and `fingerprint` gives a content-addressed id.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    ChannelBreakout, Ensemble, FixedSchedule, MaCrossover, MaType, MomentumThreshold,
    ParabolicSarFlip, Strategy, SupertrendFlip,
};
use crate::error::ConfigError;

/// Agreement rule for ensemble votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// At least `n/2 + 1` members agree.
    #[default]
    Majority,
    /// Members weighted by horizon; strictly more than half the total weight agrees.
    WeightedByHorizon,
    /// Every member must be long to enter; any single member going flat exits.
    UnanimousEntry,
}

/// A single parameter value as it appears in grids and descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    MaCrossover {
        fast: usize,
        slow: usize,
        #[serde(default)]
        ma_type: MaType,
    },
    ChannelBreakout {
        entry_lookback: usize,
        exit_lookback: usize,
    },
    SupertrendFlip {
        atr_period: usize,
        multiplier: f64,
    },
    #[serde(rename = "psar_flip")]
    ParabolicSarFlip {
        af_start: f64,
        af_step: f64,
        af_max: f64,
    },
    Momentum {
        lookback: usize,
        entry_threshold: f64,
        #[serde(default)]
        exit_threshold: f64,
    },
    Ensemble {
        members: Vec<StrategyParams>,
        #[serde(default)]
        voting: VotingMethod,
    },
    FixedSchedule {
        entries: Vec<usize>,
        exits: Vec<usize>,
    },
}

impl StrategyParams {
    /// Stable identifier of the strategy family.
    pub fn strategy_id(&self) -> &'static str {
        match self {
            StrategyParams::MaCrossover { .. } => "ma_crossover",
            StrategyParams::ChannelBreakout { .. } => "channel_breakout",
            StrategyParams::SupertrendFlip { .. } => "supertrend_flip",
            StrategyParams::ParabolicSarFlip { .. } => "psar_flip",
            StrategyParams::Momentum { .. } => "momentum",
            StrategyParams::Ensemble { .. } => "ensemble",
            StrategyParams::FixedSchedule { .. } => "fixed_schedule",
        }
    }

    /// Reject out-of-domain parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.strategy_id();
        match self {
            StrategyParams::MaCrossover { fast, slow, .. } => {
                period(id, "fast", *fast)?;
                period(id, "slow", *slow)?;
                if fast >= slow {
                    return Err(ConfigError::Invalid {
                        strategy: id,
                        reason: format!("fast ({fast}) must be < slow ({slow})"),
                    });
                }
            }
            StrategyParams::ChannelBreakout {
                entry_lookback,
                exit_lookback,
            } => {
                period(id, "entry_lookback", *entry_lookback)?;
                period(id, "exit_lookback", *exit_lookback)?;
            }
            StrategyParams::SupertrendFlip {
                atr_period,
                multiplier,
            } => {
                period(id, "atr_period", *atr_period)?;
                if !multiplier.is_finite() || *multiplier <= 0.0 {
                    return Err(ConfigError::out_of_range(
                        id,
                        "multiplier",
                        *multiplier,
                        "must be finite and > 0",
                    ));
                }
            }
            StrategyParams::ParabolicSarFlip {
                af_start,
                af_step,
                af_max,
            } => {
                unit_interval(id, "af_start", *af_start)?;
                unit_interval(id, "af_step", *af_step)?;
                unit_interval(id, "af_max", *af_max)?;
                if af_max < af_start {
                    return Err(ConfigError::Invalid {
                        strategy: id,
                        reason: format!("af_max ({af_max}) must be >= af_start ({af_start})"),
                    });
                }
            }
            StrategyParams::Momentum {
                lookback,
                entry_threshold,
                exit_threshold,
            } => {
                period(id, "lookback", *lookback)?;
                finite(id, "entry_threshold", *entry_threshold)?;
                finite(id, "exit_threshold", *exit_threshold)?;
                if exit_threshold > entry_threshold {
                    return Err(ConfigError::Invalid {
                        strategy: id,
                        reason: format!(
                            "exit_threshold ({exit_threshold}) must be <= entry_threshold ({entry_threshold})"
                        ),
                    });
                }
            }
            StrategyParams::Ensemble { members, .. } => {
                if members.is_empty() {
                    return Err(ConfigError::Invalid {
                        strategy: id,
                        reason: "needs at least one member".into(),
                    });
                }
                for member in members {
                    if matches!(
                        member,
                        StrategyParams::Ensemble { .. } | StrategyParams::FixedSchedule { .. }
                    ) {
                        return Err(ConfigError::Invalid {
                            strategy: id,
                            reason: format!("member kind `{}` cannot vote", member.strategy_id()),
                        });
                    }
                    member.validate()?;
                }
            }
            StrategyParams::FixedSchedule { .. } => {}
        }
        Ok(())
    }

    /// Build the evaluator. Call only on validated parameters; constructors
    /// assert their domain.
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyParams::MaCrossover {
                fast,
                slow,
                ma_type,
            } => Box::new(MaCrossover::new(*fast, *slow, *ma_type)),
            StrategyParams::ChannelBreakout {
                entry_lookback,
                exit_lookback,
            } => Box::new(ChannelBreakout::new(*entry_lookback, *exit_lookback)),
            StrategyParams::SupertrendFlip {
                atr_period,
                multiplier,
            } => Box::new(SupertrendFlip::new(*atr_period, *multiplier)),
            StrategyParams::ParabolicSarFlip {
                af_start,
                af_step,
                af_max,
            } => Box::new(ParabolicSarFlip::new(*af_start, *af_step, *af_max)),
            StrategyParams::Momentum {
                lookback,
                entry_threshold,
                exit_threshold,
            } => Box::new(MomentumThreshold::new(
                *lookback,
                *entry_threshold,
                *exit_threshold,
            )),
            StrategyParams::Ensemble { members, voting } => Box::new(Ensemble::new(
                members.iter().map(|m| m.build()).collect(),
                *voting,
            )),
            StrategyParams::FixedSchedule { entries, exits } => {
                Box::new(FixedSchedule::new(entries.iter().copied(), exits.iter().copied()))
            }
        }
    }

    /// Content-addressed id: blake3 over the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&canonical).to_hex().to_string()
    }

    /// Flat parameter map. Ensemble members are prefixed `m{index}.`.
    pub fn parameters(&self) -> BTreeMap<String, ParamValue> {
        let mut out = BTreeMap::new();
        match self {
            StrategyParams::MaCrossover {
                fast,
                slow,
                ma_type,
            } => {
                out.insert("fast".into(), (*fast).into());
                out.insert("slow".into(), (*slow).into());
                out.insert("ma_type".into(), ma_type.prefix().into());
            }
            StrategyParams::ChannelBreakout {
                entry_lookback,
                exit_lookback,
            } => {
                out.insert("entry_lookback".into(), (*entry_lookback).into());
                out.insert("exit_lookback".into(), (*exit_lookback).into());
            }
            StrategyParams::SupertrendFlip {
                atr_period,
                multiplier,
            } => {
                out.insert("atr_period".into(), (*atr_period).into());
                out.insert("multiplier".into(), (*multiplier).into());
            }
            StrategyParams::ParabolicSarFlip {
                af_start,
                af_step,
                af_max,
            } => {
                out.insert("af_start".into(), (*af_start).into());
                out.insert("af_step".into(), (*af_step).into());
                out.insert("af_max".into(), (*af_max).into());
            }
            StrategyParams::Momentum {
                lookback,
                entry_threshold,
                exit_threshold,
            } => {
                out.insert("lookback".into(), (*lookback).into());
                out.insert("entry_threshold".into(), (*entry_threshold).into());
                out.insert("exit_threshold".into(), (*exit_threshold).into());
            }
            StrategyParams::Ensemble { members, voting } => {
                let voting = serde_json::to_value(voting)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                out.insert("voting".into(), ParamValue::Text(voting));
                for (i, member) in members.iter().enumerate() {
                    out.insert(format!("m{i}.kind"), member.strategy_id().into());
                    for (k, v) in member.parameters() {
                        out.insert(format!("m{i}.{k}"), v);
                    }
                }
            }
            StrategyParams::FixedSchedule { entries, exits } => {
                let join = |xs: &[usize]| {
                    xs.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
                };
                out.insert("entries".into(), ParamValue::Text(join(entries)));
                out.insert("exits".into(), ParamValue::Text(join(exits)));
            }
        }
        out
    }

    /// Build parameters for a grid-enumerable kind from named axis values.
    /// Ensembles and schedules are not grid-enumerable.
    pub fn from_values(
        kind: &str,
        values: &BTreeMap<String, ParamValue>,
    ) -> Result<Self, ConfigError> {
        let params = match kind {
            "ma_crossover" => {
                let id = "ma_crossover";
                let ma_type = match values.get("ma_type") {
                    None => MaType::Sma,
                    Some(ParamValue::Text(t)) if t == "sma" => MaType::Sma,
                    Some(ParamValue::Text(t)) if t == "ema" => MaType::Ema,
                    Some(other) => {
                        return Err(ConfigError::Invalid {
                            strategy: id,
                            reason: format!("ma_type must be \"sma\" or \"ema\", got {other}"),
                        })
                    }
                };
                StrategyParams::MaCrossover {
                    fast: whole(id, values, "fast")?,
                    slow: whole(id, values, "slow")?,
                    ma_type,
                }
            }
            "channel_breakout" => {
                let id = "channel_breakout";
                StrategyParams::ChannelBreakout {
                    entry_lookback: whole(id, values, "entry_lookback")?,
                    exit_lookback: whole(id, values, "exit_lookback")?,
                }
            }
            "supertrend_flip" => {
                let id = "supertrend_flip";
                StrategyParams::SupertrendFlip {
                    atr_period: whole(id, values, "atr_period")?,
                    multiplier: number(id, values, "multiplier")?,
                }
            }
            "psar_flip" => {
                let id = "psar_flip";
                StrategyParams::ParabolicSarFlip {
                    af_start: number_or(id, values, "af_start", 0.02)?,
                    af_step: number_or(id, values, "af_step", 0.02)?,
                    af_max: number_or(id, values, "af_max", 0.20)?,
                }
            }
            "momentum" => {
                let id = "momentum";
                StrategyParams::Momentum {
                    lookback: whole(id, values, "lookback")?,
                    entry_threshold: number_or(id, values, "entry_threshold", 0.0)?,
                    exit_threshold: number_or(id, values, "exit_threshold", 0.0)?,
                }
            }
            "ensemble" | "fixed_schedule" => {
                return Err(ConfigError::Invalid {
                    strategy: if kind == "ensemble" {
                        "ensemble"
                    } else {
                        "fixed_schedule"
                    },
                    reason: "not grid-enumerable, list explicit configs instead".into(),
                })
            }
            other => return Err(ConfigError::UnknownStrategy(other.to_string())),
        };
        Ok(params)
    }
}

/// Longest lookback any strategy accepts, in bars.
pub const MAX_PERIOD: usize = 100_000;

fn period(strategy: &'static str, param: &'static str, value: usize) -> Result<(), ConfigError> {
    if value < 1 {
        return Err(ConfigError::out_of_range(strategy, param, value as f64, "must be >= 1"));
    }
    if value > MAX_PERIOD {
        return Err(ConfigError::out_of_range(
            strategy,
            param,
            value as f64,
            "must be <= 100000",
        ));
    }
    Ok(())
}

fn unit_interval(strategy: &'static str, param: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::out_of_range(strategy, param, value, "must be in (0, 1]"));
    }
    Ok(())
}

fn finite(strategy: &'static str, param: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::out_of_range(strategy, param, value, "must be finite"));
    }
    Ok(())
}

fn lookup<'a>(
    strategy: &'static str,
    values: &'a BTreeMap<String, ParamValue>,
    param: &str,
) -> Result<&'a ParamValue, ConfigError> {
    values.get(param).ok_or_else(|| ConfigError::MissingParameter {
        strategy,
        param: param.to_string(),
    })
}

fn number(
    strategy: &'static str,
    values: &BTreeMap<String, ParamValue>,
    param: &'static str,
) -> Result<f64, ConfigError> {
    lookup(strategy, values, param)?
        .as_f64()
        .ok_or_else(|| ConfigError::Invalid {
            strategy,
            reason: format!("`{param}` must be numeric"),
        })
}

fn number_or(
    strategy: &'static str,
    values: &BTreeMap<String, ParamValue>,
    param: &'static str,
    default: f64,
) -> Result<f64, ConfigError> {
    if values.contains_key(param) {
        number(strategy, values, param)
    } else {
        Ok(default)
    }
}

fn whole(
    strategy: &'static str,
    values: &BTreeMap<String, ParamValue>,
    param: &'static str,
) -> Result<usize, ConfigError> {
    let v = number(strategy, values, param)?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
        return Err(ConfigError::out_of_range(
            strategy,
            param,
            v,
            "must be a non-negative whole number",
        ));
    }
    Ok(v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn ma_crossover_requires_fast_below_slow() {
        let p = StrategyParams::MaCrossover {
            fast: 50,
            slow: 20,
            ma_type: MaType::Sma,
        };
        assert!(matches!(p.validate(), Err(ConfigError::Invalid { .. })));
        let p = StrategyParams::MaCrossover {
            fast: 0,
            slow: 20,
            ma_type: MaType::Sma,
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange { param: "fast", .. })
        ));
    }

    #[test]
    fn huge_periods_are_rejected() {
        let grid = values(&[("atr_period", ParamValue::Float(1e30)), ("multiplier", ParamValue::Float(2.0))]);
        let p = StrategyParams::from_values("supertrend_flip", &grid).unwrap();
        assert!(matches!(
            p.validate(),
            Err(ConfigError::OutOfRange { param: "atr_period", .. })
        ));
        let p = StrategyParams::ChannelBreakout {
            entry_lookback: MAX_PERIOD + 1,
            exit_lookback: 10,
        };
        assert!(p.validate().is_err());
        let p = StrategyParams::ChannelBreakout {
            entry_lookback: MAX_PERIOD,
            exit_lookback: 10,
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn psar_bounds() {
        let ok = StrategyParams::ParabolicSarFlip {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
        };
        assert!(ok.validate().is_ok());
        let bad = StrategyParams::ParabolicSarFlip {
            af_start: 0.3,
            af_step: 0.02,
            af_max: 0.2,
        };
        assert!(bad.validate().is_err());
        let negative = StrategyParams::ParabolicSarFlip {
            af_start: -0.1,
            af_step: 0.02,
            af_max: 0.2,
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::OutOfRange { param: "af_start", .. })
        ));
    }

    #[test]
    fn supertrend_multiplier_must_be_positive() {
        let p = StrategyParams::SupertrendFlip {
            atr_period: 10,
            multiplier: 0.0,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn momentum_exit_above_entry_rejected() {
        let p = StrategyParams::Momentum {
            lookback: 20,
            entry_threshold: 0.0,
            exit_threshold: 0.1,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn ensemble_rejects_empty_and_nested() {
        let empty = StrategyParams::Ensemble {
            members: vec![],
            voting: VotingMethod::Majority,
        };
        assert!(empty.validate().is_err());

        let nested = StrategyParams::Ensemble {
            members: vec![empty.clone()],
            voting: VotingMethod::Majority,
        };
        assert!(nested.validate().is_err());

        let bad_member = StrategyParams::Ensemble {
            members: vec![StrategyParams::ChannelBreakout {
                entry_lookback: 0,
                exit_lookback: 10,
            }],
            voting: VotingMethod::Majority,
        };
        assert!(bad_member.validate().is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_param_sensitive() {
        let a = StrategyParams::ChannelBreakout {
            entry_lookback: 20,
            exit_lookback: 10,
        };
        let b = StrategyParams::ChannelBreakout {
            entry_lookback: 20,
            exit_lookback: 11,
        };
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn from_values_builds_and_defaults() {
        let p = StrategyParams::from_values(
            "ma_crossover",
            &values(&[("fast", ParamValue::Int(10)), ("slow", ParamValue::Int(50))]),
        )
        .unwrap();
        assert_eq!(
            p,
            StrategyParams::MaCrossover {
                fast: 10,
                slow: 50,
                ma_type: MaType::Sma
            }
        );

        let psar = StrategyParams::from_values("psar_flip", &BTreeMap::new()).unwrap();
        assert_eq!(psar.strategy_id(), "psar_flip");
    }

    #[test]
    fn from_values_errors() {
        assert!(matches!(
            StrategyParams::from_values("nope", &BTreeMap::new()),
            Err(ConfigError::UnknownStrategy(_))
        ));
        assert!(matches!(
            StrategyParams::from_values("channel_breakout", &values(&[("entry_lookback", ParamValue::Int(5))])),
            Err(ConfigError::MissingParameter { .. })
        ));
        assert!(matches!(
            StrategyParams::from_values(
                "momentum",
                &values(&[("lookback", ParamValue::Float(2.5))])
            ),
            Err(ConfigError::OutOfRange { param: "lookback", .. })
        ));
    }

    #[test]
    fn serde_tagged_roundtrip() {
        let p = StrategyParams::Ensemble {
            members: vec![
                StrategyParams::MaCrossover {
                    fast: 5,
                    slow: 20,
                    ma_type: MaType::Ema,
                },
                StrategyParams::ParabolicSarFlip {
                    af_start: 0.02,
                    af_step: 0.02,
                    af_max: 0.2,
                },
            ],
            voting: VotingMethod::WeightedByHorizon,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"kind\":\"ensemble\""));
        assert!(json.contains("\"kind\":\"psar_flip\""));
        let back: StrategyParams = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn ensemble_parameters_are_prefixed() {
        let p = StrategyParams::Ensemble {
            members: vec![StrategyParams::ChannelBreakout {
                entry_lookback: 20,
                exit_lookback: 10,
            }],
            voting: VotingMethod::UnanimousEntry,
        };
        let params = p.parameters();
        assert_eq!(params["voting"], ParamValue::Text("unanimous_entry".into()));
        assert_eq!(params["m0.kind"], ParamValue::Text("channel_breakout".into()));
        assert_eq!(params["m0.entry_lookback"], ParamValue::Int(20));
    }
}
