//! Action space management - id layout, decoding and legality masks
//!
//! For a population of `n` agents the padded action range is `[0, 3n+2)`:
//!
//! ```text
//! [0, n)          attack agent id
//! [n, 2n)         propose alliance to agent (id - n)
//! 2n              defend
//! 2n+1            recover
//! [2n+2, 3n+2)    accept alliance from agent (id - 2n - 2)
//! ```

use crate::infra::{ActionId, AgentId, SimError, SimResult};

/// Size of the padded action range for `num_agents` agents
pub const fn action_count(num_agents: usize) -> usize {
    3 * num_agents + 2
}

/// Typed view of an action id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Attack(AgentId),
    Propose(AgentId),
    Defend,
    Recover,
    Accept(AgentId),
}

impl Action {
    /// Decode an id in `[0, 3n+2)`; ids past the range are `None`
    pub fn decode(id: ActionId, num_agents: usize) -> Option<Self> {
        let n = num_agents;
        match id {
            _ if id < n => Some(Action::Attack(id)),
            _ if id < 2 * n => Some(Action::Propose(id - n)),
            _ if id == 2 * n => Some(Action::Defend),
            _ if id == 2 * n + 1 => Some(Action::Recover),
            _ if id < action_count(n) => Some(Action::Accept(id - 2 * n - 2)),
            _ => None,
        }
    }

    pub fn encode(self, num_agents: usize) -> ActionId {
        let n = num_agents;
        match self {
            Action::Attack(target) => target,
            Action::Propose(target) => n + target,
            Action::Defend => 2 * n,
            Action::Recover => 2 * n + 1,
            Action::Accept(from) => 2 * n + 2 + from,
        }
    }
}

/// Legal actions of one agent: everything except the three self-referencing ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpace {
    agent_id: AgentId,
    num_agents: usize,
    legal: Vec<ActionId>,
    mask: Vec<bool>,
}

impl ActionSpace {
    pub fn new(agent_id: AgentId, num_agents: usize) -> SimResult<Self> {
        if num_agents < 2 {
            return Err(SimError::TooFewAgents { count: num_agents });
        }
        if agent_id >= num_agents {
            return Err(SimError::InvalidParameter {
                name: "agent_id",
                value: format!("{agent_id} for {num_agents} agents"),
            });
        }

        let excluded = [
            Action::Attack(agent_id).encode(num_agents),
            Action::Propose(agent_id).encode(num_agents),
            Action::Accept(agent_id).encode(num_agents),
        ];
        let mask: Vec<bool> = (0..action_count(num_agents))
            .map(|id| !excluded.contains(&id))
            .collect();
        let legal = mask
            .iter()
            .enumerate()
            .filter(|(_, valid)| **valid)
            .map(|(id, _)| id)
            .collect();

        Ok(Self {
            agent_id,
            num_agents,
            legal,
            mask,
        })
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// Legal ids in ascending order
    pub fn legal(&self) -> &[ActionId] {
        &self.legal
    }

    /// Validity over the full padded range
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_legal(&self, id: ActionId) -> bool {
        self.mask.get(id).copied().unwrap_or(false)
    }

    pub fn total(&self) -> usize {
        self.mask.len()
    }

    pub fn decode(&self, id: ActionId) -> Option<Action> {
        Action::decode(id, self.num_agents)
    }

    pub fn encode(&self, action: Action) -> ActionId {
        action.encode(self.num_agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_set_excludes_self_ids() {
        let space = ActionSpace::new(1, 3).unwrap();
        assert_eq!(space.total(), 11);
        assert_eq!(space.legal(), &[0, 2, 3, 5, 6, 7, 8, 10]);
        assert!(!space.is_legal(1));
        assert!(!space.is_legal(4));
        assert!(!space.is_legal(9));
        assert!(!space.is_legal(11));
    }

    #[test]
    fn test_rejects_single_agent() {
        assert!(matches!(
            ActionSpace::new(0, 1),
            Err(SimError::TooFewAgents { count: 1 })
        ));
    }

    #[test]
    fn test_decode_bands() {
        let n = 4;
        assert_eq!(Action::decode(3, n), Some(Action::Attack(3)));
        assert_eq!(Action::decode(5, n), Some(Action::Propose(1)));
        assert_eq!(Action::decode(8, n), Some(Action::Defend));
        assert_eq!(Action::decode(9, n), Some(Action::Recover));
        assert_eq!(Action::decode(10, n), Some(Action::Accept(0)));
        assert_eq!(Action::decode(13, n), Some(Action::Accept(3)));
        assert_eq!(Action::decode(14, n), None);
    }

    #[test]
    fn test_encode_inverts_decode_over_range() {
        let n = 5;
        for id in 0..action_count(n) {
            let action = Action::decode(id, n).unwrap();
            assert_eq!(action.encode(n), id);
        }
    }

    #[test]
    fn test_legal_count() {
        for n in 2..8 {
            for agent in 0..n {
                let space = ActionSpace::new(agent, n).unwrap();
                assert_eq!(space.legal().len(), action_count(n) - 3);
            }
        }
    }
}
