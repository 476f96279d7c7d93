//! Epsilon-greedy seat backed by the shared learning core

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::infra::{ActionId, SimConfig};
use crate::planners::{ActionSpace, ExplorationHint, Observation, choose_uniform};

use super::core::SharedLearner;

/// Probability of playing the arg-max once exploitation is chosen
const GREEDY_PROB: f64 = 0.95;

/// Candidates for the near-greedy pick
const TOP_K: usize = 3;

#[derive(Debug)]
pub struct LearnedPolicy {
    core: SharedLearner,
    epsilon: f64,
    epsilon_decay: f64,
    min_epsilon: f64,
    /// Ticks of a sub-game played fully at random
    warmup: usize,
}

impl LearnedPolicy {
    pub fn new(core: SharedLearner, config: &SimConfig) -> Self {
        Self {
            core,
            epsilon: config.learning.initial_epsilon,
            epsilon_decay: config.learning.epsilon_decay,
            min_epsilon: config.learning.min_epsilon,
            warmup: config.exploration_warmup(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn core(&self) -> &SharedLearner {
        &self.core
    }

    pub fn choose<R: Rng + ?Sized>(
        &mut self,
        observation: &Observation,
        actions: &ActionSpace,
        hint: ExplorationHint,
        rng: &mut R,
    ) -> ActionId {
        match hint {
            ExplorationHint::Training { tick } => {
                let explore = tick < self.warmup
                    || rng.random::<f64>() < self.epsilon.max(self.min_epsilon);
                if self.epsilon > self.min_epsilon {
                    self.epsilon *= self.epsilon_decay;
                }
                if explore {
                    choose_uniform(actions, rng)
                } else {
                    self.exploit(observation, actions, rng)
                }
            }
            ExplorationHint::PostTraining => self.exploit(observation, actions, rng),
        }
    }

    fn exploit<R: Rng + ?Sized>(
        &self,
        observation: &Observation,
        actions: &ActionSpace,
        rng: &mut R,
    ) -> ActionId {
        let values = self.core.borrow().evaluate(&observation.features());
        let masked: Vec<f32> = actions
            .mask()
            .iter()
            .enumerate()
            .map(|(id, valid)| match values.get(id) {
                Some(value) if *valid => *value,
                _ => f32::NEG_INFINITY,
            })
            .collect();

        // Descending by value; the stable sort keeps lower ids first on ties
        let mut ranked: Vec<ActionId> = actions.legal().to_vec();
        ranked.sort_by(|a, b| masked[*b].total_cmp(&masked[*a]));

        if rng.random::<f64>() < GREEDY_PROB {
            ranked[0]
        } else {
            let top = &ranked[..TOP_K.min(ranked.len())];
            top.choose(rng).copied().unwrap_or(ranked[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planners::rl::{Experience, LearningCore};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup() -> (SimConfig, SharedLearner) {
        let config = SimConfig::for_agents(2);
        let core = LearningCore::from_config(&config).unwrap().shared();
        (config, core)
    }

    fn observation() -> Observation {
        Observation {
            agent_id: 0,
            health: vec![2.0, 2.0],
            alliance_status: 1.0,
            alliance_partner: None,
        }
    }

    #[test]
    fn test_epsilon_decays_only_in_training() {
        let (config, core) = setup();
        let mut policy = LearnedPolicy::new(core, &config);
        let actions = ActionSpace::new(0, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        policy.choose(&observation(), &actions, ExplorationHint::PostTraining, &mut rng);
        assert_eq!(policy.epsilon(), 1.0);

        policy.choose(&observation(), &actions, ExplorationHint::Training { tick: 0 }, &mut rng);
        assert!((policy.epsilon() - 0.995).abs() < 1e-12);
    }

    #[test]
    fn test_post_training_mostly_greedy() {
        let (config, core) = setup();
        let actions = ActionSpace::new(0, 2).unwrap();
        let recover = actions.encode(crate::planners::Action::Recover);
        core.borrow_mut().learn(
            Experience {
                state: observation().features(),
                action: recover,
                reward: 5.0,
                next_state: vec![0.0, 0.0, 1.0],
                done: false,
            },
            &mut rand::rng(),
        );

        let mut policy = LearnedPolicy::new(core, &config);
        let mut rng = StdRng::seed_from_u64(2);
        let greedy = (0..400)
            .map(|_| policy.choose(&observation(), &actions, ExplorationHint::PostTraining, &mut rng))
            .filter(|id| *id == recover)
            .count();
        assert!(greedy > 360);
    }

    #[test]
    fn test_choices_stay_legal() {
        let (config, core) = setup();
        let mut policy = LearnedPolicy::new(core, &config);
        let actions = ActionSpace::new(1, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for tick in 0..300 {
            let hint = if tick % 2 == 0 {
                ExplorationHint::Training { tick }
            } else {
                ExplorationHint::PostTraining
            };
            let id = policy.choose(&observation(), &actions, hint, &mut rng);
            assert!(actions.is_legal(id));
        }
    }
}
