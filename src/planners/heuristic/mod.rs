//! Rule-based seat: a fixed priority list over the observation

use tracing::trace;

use crate::infra::{ActionId, AgentId};

use super::{Action, ActionSpace, Observation};

#[derive(Debug, Clone)]
pub struct HeuristicPolicy {
    health_granularity: f64,
    weak_threshold: f64,
}

impl HeuristicPolicy {
    pub fn new(health_granularity: f64, weak_threshold: f64) -> Self {
        Self {
            health_granularity,
            weak_threshold,
        }
    }

    pub fn choose(&self, observation: &Observation, actions: &ActionSpace) -> ActionId {
        let action = self.decide(observation);
        trace!(agent = observation.agent_id, ?action, "heuristic decision");
        actions.encode(action)
    }

    fn decide(&self, observation: &Observation) -> Action {
        let me = observation.agent_id;
        if observation.health[me] <= self.health_granularity {
            return Action::Recover;
        }

        // Strict comparisons keep the lowest id on ties
        let opponents = || {
            observation
                .health
                .iter()
                .enumerate()
                .filter(move |(id, health)| *id != me && **health > 0.0)
        };

        let weakest = opponents()
            .filter(|(id, _)| Some(*id) != observation.alliance_partner)
            .fold(None::<(AgentId, f64)>, |best, (id, health)| match best {
                Some((_, h)) if *health >= h => best,
                _ => Some((id, *health)),
            });
        if let Some((target, health)) = weakest {
            if health <= self.weak_threshold {
                return Action::Attack(target);
            }
        }

        if observation.alliance_partner.is_none() {
            let strongest = opponents().fold(None::<(AgentId, f64)>, |best, (id, health)| {
                match best {
                    Some((_, h)) if *health <= h => best,
                    _ => Some((id, *health)),
                }
            });
            if let Some((target, _)) = strongest {
                return Action::Propose(target);
            }
        }

        Action::Defend
    }
}
