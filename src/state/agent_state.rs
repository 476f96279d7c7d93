use std::collections::VecDeque;

use rand::Rng;

use crate::infra::{ActionId, AgentId, PolicyKind};
use crate::planners::{ActionSpace, ExplorationHint, Observation, Policy};

use super::committed::Committed;

/// Alliance status multiplier of an agent without an ally
pub const BASELINE_ALLIANCE_STATUS: f64 = 1.0;

/// Number of past ticks remembered for detecting repeated proposals
pub const PROPOSAL_HISTORY_LEN: usize = 3;

/// Mutable per-seat state, rolled back together between training sub-games
#[derive(Debug, Clone, PartialEq)]
pub struct SeatState {
    /// Believed health of every agent, in granularity steps; own entry is ground truth
    pub health_belief: Vec<u32>,
    pub alliance_status: f64,
    pub alliance_partner: Option<AgentId>,
    pub alive: bool,
    pub latest_action: ActionId,
    /// Recipient of this tick's alliance proposal, if any
    pub pending_proposal: Option<AgentId>,
    pub reward: f64,
    /// Proposal recipient of each of the last few ticks (oldest first)
    pub proposal_history: VecDeque<Option<AgentId>>,
}

impl SeatState {
    pub fn new(id: AgentId, health: &[u32]) -> Self {
        Self {
            health_belief: health.to_vec(),
            alliance_status: BASELINE_ALLIANCE_STATUS,
            alliance_partner: None,
            alive: health[id] > 0,
            latest_action: id,
            pending_proposal: None,
            reward: 0.0,
            proposal_history: VecDeque::with_capacity(PROPOSAL_HISTORY_LEN),
        }
    }

    pub fn own_health(&self, id: AgentId) -> u32 {
        self.health_belief[id]
    }

    /// Record this tick's proposal and report whether the same target was
    /// proposed to on every remembered tick
    pub fn record_proposal(&mut self, target: Option<AgentId>) -> bool {
        if self.proposal_history.len() == PROPOSAL_HISTORY_LEN {
            self.proposal_history.pop_front();
        }
        self.proposal_history.push_back(target);

        target.is_some()
            && self.proposal_history.len() == PROPOSAL_HISTORY_LEN
            && self.proposal_history.iter().all(|t| *t == target)
    }

    pub fn leave_alliance(&mut self) {
        self.alliance_partner = None;
        self.alliance_status = BASELINE_ALLIANCE_STATUS;
    }
}

/// One seat of the game: identity, policy, legal actions and mutable state
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    policy: Policy,
    actions: ActionSpace,
    state: Committed<SeatState>,
}

impl Agent {
    pub fn new(id: AgentId, policy: Policy, actions: ActionSpace, health: &[u32]) -> Self {
        Self {
            id,
            policy,
            actions,
            state: Committed::new(SeatState::new(id, health)),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn actions(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn state(&self) -> &SeatState {
        self.state.current()
    }

    pub fn state_mut(&mut self) -> &mut SeatState {
        self.state.current_mut()
    }

    pub fn stable_state(&self) -> &SeatState {
        self.state.stable()
    }

    pub fn is_alive(&self) -> bool {
        self.state().alive
    }

    pub fn commit(&mut self) {
        self.state.commit();
    }

    pub fn rollback(&mut self) {
        self.state.rollback();
    }

    /// What this seat currently knows: its health beliefs and alliance
    pub fn observe(&self, health_granularity: f64) -> Observation {
        let state = self.state();
        Observation {
            agent_id: self.id,
            health: state
                .health_belief
                .iter()
                .map(|steps| f64::from(*steps) * health_granularity)
                .collect(),
            alliance_status: state.alliance_status,
            alliance_partner: state.alliance_partner,
        }
    }

    /// Pick and store this tick's action. Dead seats surrender with their own id.
    pub fn choose_action<R: Rng + ?Sized>(
        &mut self,
        health_granularity: f64,
        hint: ExplorationHint,
        rng: &mut R,
    ) -> ActionId {
        let action = if self.is_alive() {
            let observation = self.observe(health_granularity);
            self.policy.choose(&observation, &self.actions, hint, rng)
        } else {
            self.id
        };
        self.state_mut().latest_action = action;
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_new_seat_is_unallied() {
        let state = SeatState::new(1, &[2, 2, 2]);
        assert!(state.alive);
        assert_eq!(state.alliance_partner, None);
        assert_eq!(state.alliance_status, BASELINE_ALLIANCE_STATUS);
    }

    #[test]
    fn test_zero_health_starts_dead() {
        let state = SeatState::new(0, &[0, 2]);
        assert!(!state.alive);
    }

    #[test]
    fn test_repeated_proposal_detected_on_third_tick() {
        let mut state = SeatState::new(0, &[2, 2, 2]);
        assert!(!state.record_proposal(Some(2)));
        assert!(!state.record_proposal(Some(2)));
        assert!(state.record_proposal(Some(2)));
        assert!(!state.record_proposal(Some(1)));
        assert!(!state.record_proposal(None));
    }

    #[test]
    fn test_dead_agent_surrenders() {
        let actions = ActionSpace::new(1, 3).unwrap();
        let mut agent = Agent::new(1, Policy::Random, actions, &[2, 0, 2]);
        let mut rng = StdRng::seed_from_u64(9);

        let action = agent.choose_action(1.0, ExplorationHint::PostTraining, &mut rng);
        assert_eq!(action, 1);
        assert_eq!(agent.state().latest_action, 1);
    }

    #[test]
    fn test_observation_scales_by_granularity() {
        let actions = ActionSpace::new(0, 2).unwrap();
        let agent = Agent::new(0, Policy::Random, actions, &[4, 1]);
        let observation = agent.observe(0.5);
        assert_eq!(observation.health, vec![2.0, 0.5]);
        assert_eq!(observation.features(), vec![2.0, 0.5, 1.0]);
    }
}
