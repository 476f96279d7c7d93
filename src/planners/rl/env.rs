//! The arena: world, seats and shared learner behind a step/rollback interface

use rand::Rng;
use tracing::trace;

use crate::engine::resolve_tick;
use crate::game::TerminationReason;
use crate::infra::{ActionId, AgentId, PolicyKind, SimConfig, SimError, SimResult};
use crate::planners::{ActionSpace, ExplorationHint, HeuristicPolicy, Policy};
use crate::state::{Agent, WorldState};

use super::core::{LearningCore, SharedLearner};
use super::learned::LearnedPolicy;
use super::replay::Experience;

/// Canonical per-tick state of the living agents:
/// `(id, health steps, alliance status bits, partner)`, ascending by id
pub type Signature = Vec<(AgentId, u32, u64, Option<AgentId>)>;

/// What happened during one tick
#[derive(Debug, Clone)]
pub struct StepResult {
    pub actions: Vec<ActionId>,
    pub rewards: Vec<f64>,
    /// Mean loss of the gradient steps taken this tick
    pub loss: Option<f32>,
}

#[derive(Debug)]
pub struct Arena {
    config: SimConfig,
    world: WorldState,
    agents: Vec<Agent>,
    learner: Option<SharedLearner>,
}

impl Arena {
    /// Build the world from the configured profiles and seat every agent
    pub fn new<R: Rng + ?Sized>(config: SimConfig, rng: &mut R) -> SimResult<Self> {
        let world = WorldState::from_config(&config, rng);
        Self::with_world(config, world)
    }

    /// Seat every agent on an already built world
    pub fn with_world(mut config: SimConfig, world: WorldState) -> SimResult<Self> {
        config.validate()?;
        if world.num_agents() != config.num_agents {
            return Err(SimError::InvalidParameter {
                name: "SIM_AGENTS",
                value: format!(
                    "{} configured, {} in world",
                    config.num_agents,
                    world.num_agents()
                ),
            });
        }

        let learner = if config.learned_seat_count() > 0 {
            Some(LearningCore::from_config(&config)?.shared())
        } else {
            None
        };

        let agents = (0..config.num_agents)
            .map(|id| -> SimResult<Agent> {
                let policy = match (config.policies[id], &learner) {
                    (PolicyKind::Learned, Some(core)) => {
                        Policy::Learned(LearnedPolicy::new(core.clone(), &config))
                    }
                    (PolicyKind::Heuristic, _) => Policy::Heuristic(HeuristicPolicy::new(
                        config.health_granularity,
                        config.weak_health_threshold,
                    )),
                    _ => Policy::Random,
                };
                let actions = ActionSpace::new(id, config.num_agents)?;
                Ok(Agent::new(id, policy, actions, world.health_steps()))
            })
            .collect::<SimResult<Vec<_>>>()?;

        Ok(Self {
            config,
            world,
            agents,
            learner,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id]
    }

    pub fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id]
    }

    pub fn learner(&self) -> Option<&SharedLearner> {
        self.learner.as_ref()
    }

    /// Exploration rate of the first Learned seat
    pub fn learned_epsilon(&self) -> Option<f64> {
        self.agents.iter().find_map(|agent| match agent.policy() {
            Policy::Learned(policy) => Some(policy.epsilon()),
            _ => None,
        })
    }

    /// Every seat picks an action, the tick is resolved and, while
    /// training, every living Learned seat feeds the shared learner
    pub fn step<R: Rng + ?Sized>(&mut self, hint: ExplorationHint, rng: &mut R) -> StepResult {
        let granularity = self.config.health_granularity;
        let training = matches!(hint, ExplorationHint::Training { .. });

        let before: Vec<Option<Vec<f32>>> = self
            .agents
            .iter()
            .map(|agent| {
                let learns = training
                    && agent.is_alive()
                    && agent.policy_kind() == PolicyKind::Learned;
                learns.then(|| agent.observe(granularity).features())
            })
            .collect();

        let actions: Vec<ActionId> = self
            .agents
            .iter_mut()
            .map(|agent| agent.choose_action(granularity, hint, rng))
            .collect();
        trace!(?actions, "actions chosen");

        resolve_tick(&mut self.world, &mut self.agents, &self.config.combat, rng);

        let loss = if training { self.learn(before, rng) } else { None };
        StepResult {
            actions,
            rewards: self.rewards(),
            loss,
        }
    }

    /// Resolve a tick with externally chosen actions; dead seats surrender
    pub fn step_with_actions<R: Rng + ?Sized>(
        &mut self,
        actions: &[ActionId],
        rng: &mut R,
    ) -> StepResult {
        for (agent, action) in self.agents.iter_mut().zip(actions) {
            let chosen = if agent.is_alive() { *action } else { agent.id() };
            agent.state_mut().latest_action = chosen;
        }
        resolve_tick(&mut self.world, &mut self.agents, &self.config.combat, rng);
        StepResult {
            actions: self
                .agents
                .iter()
                .map(|agent| agent.state().latest_action)
                .collect(),
            rewards: self.rewards(),
            loss: None,
        }
    }

    fn learn<R: Rng + ?Sized>(&mut self, before: Vec<Option<Vec<f32>>>, rng: &mut R) -> Option<f32> {
        let core = self.learner.as_ref()?;
        let granularity = self.config.health_granularity;

        let losses: Vec<f32> = before
            .into_iter()
            .enumerate()
            .filter_map(|(id, state)| {
                let state = state?;
                let agent = &self.agents[id];
                let experience = Experience {
                    state,
                    action: agent.state().latest_action,
                    reward: agent.state().reward as f32,
                    next_state: agent.observe(granularity).features(),
                    done: !agent.is_alive(),
                };
                core.borrow_mut().learn(experience, rng)
            })
            .collect();

        if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f32>() / losses.len() as f32)
        }
    }

    pub fn rewards(&self) -> Vec<f64> {
        self.agents.iter().map(|agent| agent.state().reward).collect()
    }

    pub fn alive_ids(&self) -> Vec<AgentId> {
        (0..self.agents.len())
            .filter(|id| self.world.is_alive(*id))
            .collect()
    }

    fn mutually_allied(&self, a: AgentId, b: AgentId) -> bool {
        self.agents[a].state().alliance_partner == Some(b)
            && self.agents[b].state().alliance_partner == Some(a)
    }

    /// A training sub-game ends once at most one agent lives or the two
    /// survivors are allied
    pub fn subgame_over(&self) -> bool {
        match self.alive_ids().as_slice() {
            [] | [_] => true,
            [a, b] => self.mutually_allied(*a, *b),
            _ => false,
        }
    }

    /// Win conditions of the evaluation episode. No survivors at all is left
    /// to the stalemate detector.
    pub fn outcome(&self) -> Option<TerminationReason> {
        let alive = self.alive_ids();
        match alive.as_slice() {
            [_] => Some(TerminationReason::SingleWinner),
            [a, b] if self.mutually_allied(*a, *b) => Some(TerminationReason::AlliedPairWinner),
            ids if ids.len() > 2 && ids.len() % 2 == 0 => {
                let all_paired = ids.iter().all(|id| {
                    self.agents[*id]
                        .state()
                        .alliance_partner
                        .is_some_and(|partner| {
                            self.world.is_alive(partner) && self.mutually_allied(*id, partner)
                        })
                });
                all_paired.then_some(TerminationReason::AllPairedStalemate)
            }
            _ => None,
        }
    }

    pub fn signature(&self) -> Signature {
        self.alive_ids()
            .into_iter()
            .map(|id| {
                let state = self.agents[id].state();
                (
                    id,
                    self.world.health(id),
                    state.alliance_status.to_bits(),
                    state.alliance_partner,
                )
            })
            .collect()
    }

    pub fn commit(&mut self) {
        self.world.commit();
        for agent in &mut self.agents {
            agent.commit();
        }
    }

    pub fn rollback(&mut self) {
        self.world.rollback();
        for agent in &mut self.agents {
            agent.rollback();
        }
    }
}
