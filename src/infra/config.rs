//! Simulation settings, loaded from the environment (optionally via `.env`)

use std::env;
use std::str::FromStr;

use super::error::{SimError, SimResult};
use super::types::{AnimosityProfile, EstimatorKind, HealthProfile, PolicyKind};

/// Combat and alliance probability constants
#[derive(Debug, Clone)]
pub struct CombatConfig {
    /// Attack strength
    pub baseline_att_prob: f64,
    /// Defense strength
    pub baseline_def_prob: f64,
    /// Recovery probability when nobody attacks the agent
    pub baseline_recover_prob: f64,
    /// Multiplied with the attack baseline when the attacker is attacked back
    pub underattack_attack_multiplier: f64,
    /// Damage probability for an attacker that nobody attacks
    pub notunderattack_attack_prob: f64,
    pub attack_dead_opponent_penalty: f64,
    pub attack_alliance_member_penalty: f64,
    pub propose_alliance_member_penalty: f64,
    /// Penalty for proposing to the same target three ticks in a row
    pub repeated_proposal_penalty: f64,
    /// Opponent term of the reward when the attacked target is believed dead
    pub dead_target_reward: f64,
    pub animosity_decrease_prob: f64,
    pub animosity_decrease_prob_alliance_proposal: f64,
    pub animosity_increase_prob: f64,
    /// Divided by the current animosity to get the alliance acceptance probability
    pub alliance_prob_with_some_animosity_baseline: f64,
    pub alliance_prob_with_no_animosity: f64,
    /// Alliance status multiplier while allied (baseline is 1.0)
    pub alliance_status_weight: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            baseline_att_prob: 0.25,
            baseline_def_prob: 0.66,
            baseline_recover_prob: 0.90,
            underattack_attack_multiplier: 1.20,
            notunderattack_attack_prob: 0.20,
            attack_dead_opponent_penalty: 0.2,
            attack_alliance_member_penalty: 0.3,
            propose_alliance_member_penalty: 0.2,
            repeated_proposal_penalty: 0.5,
            dead_target_reward: -0.1,
            animosity_decrease_prob: 0.3,
            animosity_decrease_prob_alliance_proposal: 0.6,
            animosity_increase_prob: 0.5,
            alliance_prob_with_some_animosity_baseline: 0.6,
            alliance_prob_with_no_animosity: 0.9,
            alliance_status_weight: 1.5,
        }
    }
}

/// Hyperparameters of the shared learning core
#[derive(Debug, Clone)]
pub struct LearningConfig {
    /// Tabular learning rate
    pub alpha: f64,
    /// Discount factor
    pub discount: f64,
    /// Optimizer learning rate for the network estimator
    pub learning_rate: f64,
    pub initial_epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub target_update_frequency: usize,
    pub hidden_size: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            discount: 0.9,
            learning_rate: 1e-3,
            initial_epsilon: 1.0,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            replay_capacity: 10_000,
            batch_size: 32,
            target_update_frequency: 100,
            hidden_size: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub num_agents: usize,
    pub health_profile: HealthProfile,
    pub animosity_profile: AnimosityProfile,
    /// One entry per seat; missing seats are filled with `Random` by `validate`
    pub policies: Vec<PolicyKind>,
    pub estimator: EstimatorKind,
    /// Tick budget of a training sub-game and of the evaluation episode
    pub max_iteration: usize,
    pub max_health: f64,
    pub health_granularity: f64,
    /// Heuristic seats attack opponents at or below this health
    pub weak_health_threshold: f64,
    /// Consecutive unchanged evaluation ticks before declaring a stalemate
    pub stalemate_window: usize,
    pub seed: u64,
    pub records_folder: Option<String>,
    pub model_path: Option<String>,
    pub combat: CombatConfig,
    pub learning: LearningConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_agents: 3,
            health_profile: HealthProfile::Full,
            animosity_profile: AnimosityProfile::Low,
            policies: vec![PolicyKind::Learned, PolicyKind::Heuristic, PolicyKind::Random],
            estimator: EstimatorKind::Tabular,
            max_iteration: 1000,
            max_health: 2.0,
            health_granularity: 1.0,
            weak_health_threshold: 1.0,
            stalemate_window: 100,
            seed: 42,
            records_folder: None,
            model_path: None,
            combat: CombatConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

fn get_env_var<T: FromStr>(key: &'static str) -> SimResult<Option<T>> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SimError::InvalidParameter { name: key, value: val }),
        Err(_) => Ok(None),
    }
}

fn check_probability(name: &'static str, value: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value: value.to_string(),
        })
    }
}

fn check_positive(name: &'static str, value: f64) -> SimResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value: value.to_string(),
        })
    }
}

impl SimConfig {
    /// Defaults for `num_agents` seats: seat 0 learns, the rest play randomly
    pub fn for_agents(num_agents: usize) -> Self {
        let policies = (0..num_agents)
            .map(|i| if i == 0 { PolicyKind::Learned } else { PolicyKind::Random })
            .collect();
        Self {
            num_agents,
            policies,
            ..Self::default()
        }
    }

    pub fn with_policies(mut self, policies: Vec<PolicyKind>) -> Self {
        self.policies = policies;
        self
    }

    /// Build the configuration from `SIM_*` environment variables
    pub fn from_env() -> SimResult<Self> {
        let mut config = Self::default();

        if let Some(n) = get_env_var::<usize>("SIM_AGENTS")? {
            config.num_agents = n;
            config.policies = Self::for_agents(n).policies;
        }
        if let Some(selector) = get_env_var::<u32>("SIM_HEALTH_PROFILE")? {
            config.health_profile = HealthProfile::from_selector(selector)?;
        }
        if let Some(selector) = get_env_var::<u32>("SIM_ANIMOSITY_PROFILE")? {
            config.animosity_profile = AnimosityProfile::from_selector(selector)?;
        }
        if let Ok(list) = env::var("SIM_POLICIES") {
            config.policies = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<SimResult<Vec<PolicyKind>>>()?;
        }
        if let Ok(name) = env::var("SIM_ESTIMATOR") {
            config.estimator = name.parse()?;
        }
        if let Some(v) = get_env_var("SIM_MAX_ITERATION")? {
            config.max_iteration = v;
        }
        if let Some(v) = get_env_var("SIM_SEED")? {
            config.seed = v;
        }
        if let Some(v) = get_env_var("SIM_MAX_HEALTH")? {
            config.max_health = v;
        }
        if let Some(v) = get_env_var("SIM_HEALTH_GRANULARITY")? {
            config.health_granularity = v;
        }
        if let Some(v) = get_env_var("SIM_WEAK_HEALTH_THRESHOLD")? {
            config.weak_health_threshold = v;
        }
        if let Some(v) = get_env_var("SIM_STALEMATE_WINDOW")? {
            config.stalemate_window = v;
        }

        let learning = &mut config.learning;
        if let Some(v) = get_env_var("SIM_ALPHA")? {
            learning.alpha = v;
        }
        if let Some(v) = get_env_var("SIM_DISCOUNT")? {
            learning.discount = v;
        }
        if let Some(v) = get_env_var("SIM_LEARNING_RATE")? {
            learning.learning_rate = v;
        }
        if let Some(v) = get_env_var("SIM_INITIAL_EPSILON")? {
            learning.initial_epsilon = v;
        }
        if let Some(v) = get_env_var("SIM_EPSILON_DECAY")? {
            learning.epsilon_decay = v;
        }
        if let Some(v) = get_env_var("SIM_MIN_EPSILON")? {
            learning.min_epsilon = v;
        }
        if let Some(v) = get_env_var("SIM_REPLAY_CAPACITY")? {
            learning.replay_capacity = v;
        }
        if let Some(v) = get_env_var("SIM_BATCH_SIZE")? {
            learning.batch_size = v;
        }
        if let Some(v) = get_env_var("SIM_TARGET_UPDATE_FREQUENCY")? {
            learning.target_update_frequency = v;
        }
        if let Some(v) = get_env_var("SIM_HIDDEN_SIZE")? {
            learning.hidden_size = v;
        }

        config.records_folder = env::var("SIM_RECORDS_FOLDER").ok();
        config.model_path = env::var("SIM_MODEL_PATH").ok();

        config.validate()?;
        Ok(config)
    }

    /// Check every setting and pad the policy list to one entry per seat
    pub fn validate(&mut self) -> SimResult<()> {
        if self.num_agents < 2 {
            return Err(SimError::TooFewAgents {
                count: self.num_agents,
            });
        }
        if self.policies.len() > self.num_agents {
            return Err(SimError::InvalidParameter {
                name: "SIM_POLICIES",
                value: format!("{} entries for {} agents", self.policies.len(), self.num_agents),
            });
        }
        self.policies.resize(self.num_agents, PolicyKind::Random);

        check_positive("SIM_HEALTH_GRANULARITY", self.health_granularity)?;
        check_positive("SIM_MAX_HEALTH", self.max_health)?;
        let ratio = self.max_health / self.health_granularity;
        if ratio < 1.0 || (ratio - ratio.round()).abs() > 1e-9 {
            return Err(SimError::InvalidParameter {
                name: "SIM_MAX_HEALTH",
                value: format!(
                    "{} is not a multiple of granularity {}",
                    self.max_health, self.health_granularity
                ),
            });
        }
        if self.max_iteration == 0 {
            return Err(SimError::InvalidParameter {
                name: "SIM_MAX_ITERATION",
                value: "0".to_string(),
            });
        }
        if self.stalemate_window == 0 {
            return Err(SimError::InvalidParameter {
                name: "SIM_STALEMATE_WINDOW",
                value: "0".to_string(),
            });
        }

        let combat = &self.combat;
        check_probability("baseline_recover_prob", combat.baseline_recover_prob)?;
        check_probability("notunderattack_attack_prob", combat.notunderattack_attack_prob)?;
        check_probability("animosity_decrease_prob", combat.animosity_decrease_prob)?;
        check_probability(
            "animosity_decrease_prob_alliance_proposal",
            combat.animosity_decrease_prob_alliance_proposal,
        )?;
        check_probability("animosity_increase_prob", combat.animosity_increase_prob)?;
        check_probability(
            "alliance_prob_with_no_animosity",
            combat.alliance_prob_with_no_animosity,
        )?;
        check_positive("alliance_status_weight", combat.alliance_status_weight)?;

        let learning = &self.learning;
        check_probability("SIM_ALPHA", learning.alpha)?;
        check_probability("SIM_DISCOUNT", learning.discount)?;
        check_probability("SIM_INITIAL_EPSILON", learning.initial_epsilon)?;
        check_probability("SIM_EPSILON_DECAY", learning.epsilon_decay)?;
        check_probability("SIM_MIN_EPSILON", learning.min_epsilon)?;
        check_positive("SIM_LEARNING_RATE", learning.learning_rate)?;
        for (name, value) in [
            ("SIM_REPLAY_CAPACITY", learning.replay_capacity),
            ("SIM_BATCH_SIZE", learning.batch_size),
            ("SIM_TARGET_UPDATE_FREQUENCY", learning.target_update_frequency),
            ("SIM_HIDDEN_SIZE", learning.hidden_size),
        ] {
            if value == 0 {
                return Err(SimError::InvalidParameter {
                    name,
                    value: "0".to_string(),
                });
            }
        }

        if self.estimator == EstimatorKind::Network
            && !cfg!(feature = "rl")
            && self.learned_seat_count() > 0
        {
            return Err(SimError::EstimatorUnavailable);
        }

        Ok(())
    }

    /// Number of health steps between 0 and `max_health`
    pub fn max_health_steps(&self) -> u32 {
        (self.max_health / self.health_granularity).round() as u32
    }

    pub fn learned_seat_count(&self) -> usize {
        self.policies
            .iter()
            .filter(|p| **p == PolicyKind::Learned)
            .count()
    }

    /// Ticks of a sub-game during which Learned seats explore unconditionally
    pub fn exploration_warmup(&self) -> usize {
        1000.min(self.max_iteration / 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let mut config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_health_steps(), 2);
        assert_eq!(config.exploration_warmup(), 200);
    }

    #[test]
    fn test_single_agent_rejected() {
        let mut config = SimConfig::for_agents(1);
        assert!(matches!(
            config.validate(),
            Err(SimError::TooFewAgents { count: 1 })
        ));
    }

    #[test]
    fn test_missing_policies_default_to_random() {
        let mut config = SimConfig::for_agents(4).with_policies(vec![PolicyKind::Heuristic]);
        config.validate().unwrap();
        assert_eq!(
            config.policies,
            vec![
                PolicyKind::Heuristic,
                PolicyKind::Random,
                PolicyKind::Random,
                PolicyKind::Random
            ]
        );
    }

    #[test]
    fn test_too_many_policies_rejected() {
        let mut config = SimConfig::for_agents(2).with_policies(vec![PolicyKind::Random; 3]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_must_align_with_granularity() {
        let mut config = SimConfig::default();
        config.max_health = 2.5;
        assert!(config.validate().is_err());

        config.health_granularity = 0.5;
        assert!(config.validate().is_ok());
        assert_eq!(config.max_health_steps(), 5);
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let mut config = SimConfig::default();
        config.learning.discount = 1.5;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidParameter { name: "SIM_DISCOUNT", .. })
        ));
    }

    #[cfg(not(feature = "rl"))]
    #[test]
    fn test_network_estimator_needs_feature() {
        let mut config = SimConfig::default();
        config.estimator = EstimatorKind::Network;
        assert!(matches!(config.validate(), Err(SimError::EstimatorUnavailable)));
    }
}
