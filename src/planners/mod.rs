//! Decision making for the seats of the game.
//!
//! Every seat owns a [`Policy`]: a closed set of strategies that all map an
//! [`Observation`] to an action id from the seat's [`ActionSpace`].

pub mod action_space;
pub mod heuristic;
pub mod rl;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::infra::{ActionId, AgentId, PolicyKind};

pub use action_space::{Action, ActionSpace, action_count};
pub use heuristic::HeuristicPolicy;
pub use rl::{LearnedPolicy, LearningCore, SharedLearner};

/// What a seat knows when it picks an action
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub agent_id: AgentId,
    /// Believed health of every agent in real units
    pub health: Vec<f64>,
    pub alliance_status: f64,
    pub alliance_partner: Option<AgentId>,
}

impl Observation {
    /// Value-function input: health beliefs followed by the alliance status
    pub fn features(&self) -> Vec<f32> {
        self.health
            .iter()
            .map(|h| *h as f32)
            .chain(std::iter::once(self.alliance_status as f32))
            .collect()
    }
}

/// Where the run is in its schedule, used by Learned seats only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationHint {
    /// Tick index within the current training sub-game
    Training { tick: usize },
    PostTraining,
}

#[derive(Debug)]
pub enum Policy {
    Random,
    Heuristic(HeuristicPolicy),
    Learned(LearnedPolicy),
}

impl Policy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Random => PolicyKind::Random,
            Policy::Heuristic(_) => PolicyKind::Heuristic,
            Policy::Learned(_) => PolicyKind::Learned,
        }
    }

    pub fn choose<R: Rng + ?Sized>(
        &mut self,
        observation: &Observation,
        actions: &ActionSpace,
        hint: ExplorationHint,
        rng: &mut R,
    ) -> ActionId {
        match self {
            Policy::Random => choose_uniform(actions, rng),
            Policy::Heuristic(policy) => policy.choose(observation, actions),
            Policy::Learned(policy) => policy.choose(observation, actions, hint, rng),
        }
    }
}

/// Uniform draw from the legal actions
pub fn choose_uniform<R: Rng + ?Sized>(actions: &ActionSpace, rng: &mut R) -> ActionId {
    actions
        .legal()
        .choose(rng)
        .copied()
        .unwrap_or_else(|| actions.encode(Action::Defend))
}
