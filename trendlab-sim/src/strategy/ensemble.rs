//! Ensemble: member stances combined under an agreement rule.
//!
//! Each member votes Long, Flat, or abstains at every bar. The ensemble is
//! level-triggered: it signals Enter when the entry rule is met and Exit when
//! the exit rule is met. No rule can meet both at once.

use super::{signal_from_stance, CausalContext, Signal, Stance, Strategy, VotingMethod};
use crate::indicators::Indicator;

pub struct Ensemble {
    members: Vec<Box<dyn Strategy>>,
    /// Per-member weight, the member's horizon (its warm-up length).
    weights: Vec<f64>,
    voting: VotingMethod,
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.members.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("weights", &self.weights)
            .field("voting", &self.voting)
            .finish()
    }
}

impl Ensemble {
    pub fn new(members: Vec<Box<dyn Strategy>>, voting: VotingMethod) -> Self {
        assert!(!members.is_empty(), "ensemble must have at least one member");
        let weights = members.iter().map(|m| m.warmup().max(1) as f64).collect();
        Self {
            members,
            weights,
            voting,
        }
    }

    pub fn voting(&self) -> VotingMethod {
        self.voting
    }

    fn tally(&self, ctx: &CausalContext<'_>) -> Tally {
        let mut tally = Tally::default();
        for (member, weight) in self.members.iter().zip(&self.weights) {
            tally.total_weight += weight;
            match member.stance(ctx) {
                Some(Stance::Long) => {
                    tally.long += 1;
                    tally.long_weight += weight;
                }
                Some(Stance::Flat) => {
                    tally.flat += 1;
                    tally.flat_weight += weight;
                }
                None => {}
            }
        }
        tally
    }
}

#[derive(Debug, Default)]
struct Tally {
    long: usize,
    flat: usize,
    long_weight: f64,
    flat_weight: f64,
    total_weight: f64,
}

impl Strategy for Ensemble {
    fn name(&self) -> &str {
        "ensemble"
    }

    fn warmup(&self) -> usize {
        self.members.iter().map(|m| m.warmup()).max().unwrap_or(0)
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        self.members.iter().flat_map(|m| m.indicators()).collect()
    }

    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance> {
        let t = self.tally(ctx);
        let n = self.members.len();
        let (enter, exit) = match self.voting {
            VotingMethod::Majority => {
                let majority = n / 2 + 1;
                (t.long >= majority, t.flat >= majority)
            }
            VotingMethod::WeightedByHorizon => {
                let half = t.total_weight / 2.0;
                (t.long_weight > half, t.flat_weight > half)
            }
            VotingMethod::UnanimousEntry => (t.long == n, t.flat > 0),
        };
        if enter {
            Some(Stance::Long)
        } else if exit {
            Some(Stance::Flat)
        } else {
            None
        }
    }

    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        signal_from_stance(self.stance(ctx))
    }
}
