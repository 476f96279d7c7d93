//! Simultaneous resolution of one tick
//!
//! Pass 1 records every seat's alliance proposal. Pass 2 walks the ordered
//! (actor, opponent) pairs in ascending id order and applies the combat,
//! animosity and alliance rules of the actor's action against each opponent.
//! Only the actor's own health changes on its iterations.

use rand::Rng;
use tracing::{debug, trace};

use crate::infra::{AgentId, CombatConfig};
use crate::planners::Action;
use crate::state::{Agent, WorldState};

use super::reward::compute_reward;

/// Resolve the actions stored in each seat's `latest_action` and refresh
/// every seat's reward
pub fn resolve_tick<R: Rng + ?Sized>(
    world: &mut WorldState,
    agents: &mut [Agent],
    combat: &CombatConfig,
    rng: &mut R,
) {
    let mut resolver = Resolver {
        num_agents: agents.len(),
        partners_at_start: agents
            .iter()
            .map(|agent| agent.state().alliance_partner)
            .collect(),
        world,
        agents,
        combat,
        rng,
    };

    let mut penalties = resolver.record_proposals();
    for actor in 0..resolver.num_agents {
        if !resolver.world.is_alive(actor) {
            resolver.agents[actor].state_mut().reward = 0.0;
            continue;
        }
        penalties[actor] += resolver.resolve_actor(actor);

        let granularity = resolver.world.health_granularity();
        let agent = &mut resolver.agents[actor];
        let action = Action::decode(agent.state().latest_action, resolver.num_agents);
        let reward = compute_reward(
            actor,
            agent.state(),
            action,
            granularity,
            combat,
            penalties[actor],
        );
        agent.state_mut().reward = reward;
    }
}

struct Resolver<'a, R: ?Sized> {
    num_agents: usize,
    /// Alliances as they stood before this tick; penalties are judged on these
    partners_at_start: Vec<Option<AgentId>>,
    world: &'a mut WorldState,
    agents: &'a mut [Agent],
    combat: &'a CombatConfig,
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Resolver<'_, R> {
    /// Pass 1: pending proposals from this tick's actions, plus the
    /// repeated-proposal penalty of each seat (as a negative amount)
    fn record_proposals(&mut self) -> Vec<f64> {
        let n = self.num_agents;
        let mut penalties = vec![0.0; n];
        for (id, agent) in self.agents.iter_mut().enumerate() {
            let alive = self.world.is_alive(id);
            let state = agent.state_mut();
            state.pending_proposal = match Action::decode(state.latest_action, n) {
                Some(Action::Propose(target)) if alive && target != id => Some(target),
                _ => None,
            };
            let pending = state.pending_proposal;
            if state.record_proposal(pending) {
                trace!(agent = id, target = ?pending, "repeated proposal");
                penalties[id] -= self.combat.repeated_proposal_penalty;
            }
        }
        penalties
    }

    /// Pass 2 for one living actor; returns the accumulated penalty term
    fn resolve_actor(&mut self, actor: AgentId) -> f64 {
        let Some(action) = Action::decode(self.agents[actor].state().latest_action, self.num_agents)
        else {
            return 0.0;
        };

        let mut extra = 0.0;
        for opponent in 0..self.num_agents {
            if opponent == actor {
                continue;
            }
            if !self.world.is_alive(actor) {
                break;
            }
            if !self.world.is_alive(opponent) {
                if action == Action::Attack(opponent) {
                    extra -= self.combat.attack_dead_opponent_penalty;
                    self.refresh_belief(actor, opponent);
                }
                continue;
            }
            extra += self.resolve_pair(actor, opponent, action);
        }
        extra
    }

    fn resolve_pair(&mut self, actor: AgentId, opponent: AgentId, action: Action) -> f64 {
        let combat = self.combat;
        let attacked = self.agents[opponent].state().latest_action == actor;
        if attacked {
            self.refresh_belief(actor, opponent);
        }
        let partner = self.agents[actor].state().alliance_partner;
        let partner_at_start = self.partners_at_start[actor];
        let mut extra = 0.0;

        match action {
            Action::Defend => {
                let prob = if attacked {
                    combat.baseline_att_prob * self.strength(opponent) * combat.baseline_def_prob
                        / self.strength(actor)
                } else {
                    0.0
                };
                if self.roll(prob) {
                    self.hurt(actor);
                }
            }
            Action::Recover => {
                let prob = if attacked {
                    combat.baseline_att_prob * combat.baseline_recover_prob / self.strength(opponent)
                } else {
                    combat.baseline_recover_prob
                };
                if self.roll(prob) {
                    self.heal(actor);
                }
                if self.roll(combat.animosity_decrease_prob) {
                    self.world.animosity_mut().decrease(actor, opponent);
                }
            }
            Action::Attack(target) => {
                if target == opponent {
                    if partner_at_start == Some(target) {
                        extra -= combat.attack_alliance_member_penalty;
                    }
                    self.refresh_belief(actor, opponent);
                }
                let prob = if attacked {
                    combat.baseline_att_prob
                        * self.strength(opponent)
                        * combat.underattack_attack_multiplier
                } else {
                    combat.notunderattack_attack_prob
                };
                if self.roll(prob) {
                    self.hurt(actor);
                }
                if self.roll(combat.animosity_increase_prob) {
                    self.world.animosity_mut().increase(actor, opponent);
                }
            }
            Action::Propose(target) => {
                if target == opponent && partner_at_start == Some(target) {
                    extra -= combat.propose_alliance_member_penalty;
                }
                self.passive_defense(actor, opponent, attacked);
                if self.roll(combat.animosity_decrease_prob_alliance_proposal) && target == opponent {
                    self.world.animosity_mut().decrease(actor, opponent);
                }
                let mutual = self.agents[opponent].state().pending_proposal == Some(actor);
                if target == opponent
                    && mutual
                    && partner != Some(opponent)
                    && self.world.is_alive(actor)
                {
                    debug!(actor, opponent, "mutual proposal");
                    self.form_alliance(actor, opponent);
                }
            }
            Action::Accept(from) => {
                self.passive_defense(actor, opponent, attacked);
                if self.roll(combat.animosity_decrease_prob_alliance_proposal) && from == opponent {
                    self.world.animosity_mut().decrease(actor, opponent);
                }
                let draw = self.rng.random::<f64>();
                let proposed = self.agents[opponent].state().pending_proposal == Some(actor);
                if from == opponent
                    && proposed
                    && partner != Some(opponent)
                    && self.world.is_alive(actor)
                {
                    let animosity = self.world.animosity().level(actor, opponent);
                    let prob = if animosity > 0 {
                        combat.alliance_prob_with_some_animosity_baseline / f64::from(animosity)
                    } else {
                        combat.alliance_prob_with_no_animosity
                    };
                    if draw < prob {
                        debug!(actor, opponent, animosity, "proposal accepted");
                        self.form_alliance(actor, opponent);
                    }
                }
            }
        }
        extra
    }

    /// Damage taken while proposing or accepting
    fn passive_defense(&mut self, actor: AgentId, opponent: AgentId, attacked: bool) {
        let prob = if attacked {
            self.combat.baseline_att_prob * self.strength(opponent)
        } else {
            0.0
        };
        if self.roll(prob) {
            self.hurt(actor);
        }
    }

    /// Health times alliance status
    fn strength(&self, id: AgentId) -> f64 {
        self.world.health_value(id) * self.agents[id].state().alliance_status
    }

    fn roll(&mut self, prob: f64) -> bool {
        self.rng.random::<f64>() < prob
    }

    fn refresh_belief(&mut self, actor: AgentId, opponent: AgentId) {
        let health = self.world.health(opponent);
        self.agents[actor].state_mut().health_belief[opponent] = health;
    }

    fn sync_own_health(&mut self, id: AgentId) {
        let health = self.world.health(id);
        let alive = self.world.is_alive(id);
        let state = self.agents[id].state_mut();
        state.health_belief[id] = health;
        state.alive = alive;
    }

    fn hurt(&mut self, id: AgentId) {
        if self.world.damage(id) {
            debug!(agent = id, "agent died");
        }
        self.sync_own_health(id);
    }

    fn heal(&mut self, id: AgentId) {
        self.world.heal(id);
        self.sync_own_health(id);
    }

    /// Link `a` and `b`, first dissolving any other alliance either holds
    fn form_alliance(&mut self, a: AgentId, b: AgentId) {
        for (member, other) in [(a, b), (b, a)] {
            if let Some(old) = self.agents[member].state().alliance_partner {
                if old != other {
                    self.betray(member, old);
                }
            }
        }

        let weight = self.combat.alliance_status_weight;
        for (member, other) in [(a, b), (b, a)] {
            let state = self.agents[member].state_mut();
            state.alliance_partner = Some(other);
            state.alliance_status = weight;
        }
    }

    fn betray(&mut self, betrayer: AgentId, betrayed: AgentId) {
        debug!(betrayer, betrayed, "alliance dissolved");
        self.world.animosity_mut().set_max(betrayed, betrayer);
        self.agents[betrayed].state_mut().leave_alliance();
        self.agents[betrayer].state_mut().leave_alliance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::SimConfig;
    use crate::planners::{ActionSpace, Policy};
    use crate::state::AnimosityMatrix;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup(health: Vec<u32>) -> (WorldState, Vec<Agent>) {
        setup_with_animosity(health, 0)
    }

    fn setup_with_animosity(health: Vec<u32>, animosity: u8) -> (WorldState, Vec<Agent>) {
        let n = health.len();
        let config = SimConfig::for_agents(n);
        let world = WorldState::new(
            health.clone(),
            AnimosityMatrix::uniform(n, animosity),
            &config,
        );
        let agents = (0..n)
            .map(|id| {
                Agent::new(
                    id,
                    Policy::Random,
                    ActionSpace::new(id, n).unwrap(),
                    &health,
                )
            })
            .collect();
        (world, agents)
    }

    fn act(agents: &mut [Agent], actions: &[Action]) {
        let n = agents.len();
        for (agent, action) in agents.iter_mut().zip(actions) {
            agent.state_mut().latest_action = action.encode(n);
        }
    }

    fn ally(agents: &mut [Agent], a: AgentId, b: AgentId, weight: f64) {
        for (member, other) in [(a, b), (b, a)] {
            let state = agents[member].state_mut();
            state.alliance_partner = Some(other);
            state.alliance_status = weight;
        }
    }

    /// Health after one tick of `actions` under `combat`
    fn health_after(health: Vec<u32>, actions: &[Action], combat: &CombatConfig) -> Vec<u32> {
        let (mut world, mut agents) = setup(health);
        let mut rng = StdRng::seed_from_u64(9);
        act(&mut agents, actions);
        resolve_tick(&mut world, &mut agents, combat, &mut rng);
        world.health_steps().to_vec()
    }

    #[test]
    fn test_unattacked_defenders_keep_health() {
        let (mut world, mut agents) = setup(vec![2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(1);
        act(&mut agents, &[Action::Defend, Action::Defend, Action::Defend]);
        resolve_tick(&mut world, &mut agents, &CombatConfig::default(), &mut rng);

        assert_eq!(world.health_steps(), &[2, 2, 2]);
        for agent in &agents {
            assert!((agent.state().reward - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_certain_recovery_is_capped() {
        let (mut world, mut agents) = setup(vec![1, 2]);
        let mut rng = StdRng::seed_from_u64(2);
        let combat = CombatConfig {
            baseline_recover_prob: 1.0,
            ..CombatConfig::default()
        };
        act(&mut agents, &[Action::Recover, Action::Recover]);
        resolve_tick(&mut world, &mut agents, &combat, &mut rng);

        assert_eq!(world.health_steps(), &[2, 2]);
        assert_eq!(agents[0].state().health_belief[0], 2);
    }

    #[test]
    fn test_attacking_dead_opponent_is_penalized() {
        let (mut world, mut agents) = setup(vec![2, 0, 2]);
        let mut rng = StdRng::seed_from_u64(3);
        let combat = CombatConfig {
            notunderattack_attack_prob: 0.0,
            ..CombatConfig::default()
        };
        act(&mut agents, &[Action::Attack(1), Action::Defend, Action::Defend]);
        resolve_tick(&mut world, &mut agents, &combat, &mut rng);

        let expected = 2.0 - combat.attack_dead_opponent_penalty + combat.dead_target_reward;
        assert!((agents[0].state().reward - expected).abs() < 1e-12);
        assert_eq!(agents[1].state().reward, 0.0);
    }

    #[test]
    fn test_mutual_proposal_forms_alliance() {
        let (mut world, mut agents) = setup(vec![2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(4);
        let combat = CombatConfig::default();
        act(&mut agents, &[Action::Propose(2), Action::Defend, Action::Propose(0)]);
        resolve_tick(&mut world, &mut agents, &combat, &mut rng);

        assert_eq!(agents[0].state().alliance_partner, Some(2));
        assert_eq!(agents[2].state().alliance_partner, Some(0));
        assert_eq!(agents[0].state().alliance_status, combat.alliance_status_weight);
        // the partner's health now counts toward the reward
        assert!((agents[0].state().reward - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_accept_without_proposal_does_nothing() {
        let (mut world, mut agents) = setup(vec![2, 2]);
        let mut rng = StdRng::seed_from_u64(5);
        act(&mut agents, &[Action::Accept(1), Action::Defend]);
        resolve_tick(&mut world, &mut agents, &CombatConfig::default(), &mut rng);
        assert_eq!(agents[0].state().alliance_partner, None);
    }

    #[test]
    fn test_repeated_proposal_penalty() {
        let (mut world, mut agents) = setup(vec![2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(6);
        let combat = CombatConfig::default();
        for _ in 0..3 {
            act(&mut agents, &[Action::Propose(1), Action::Defend, Action::Defend]);
            resolve_tick(&mut world, &mut agents, &combat, &mut rng);
        }
        let expected = 2.0 - combat.repeated_proposal_penalty;
        assert!((agents[0].state().reward - expected).abs() < 1e-12);
    }

    #[test]
    fn test_same_stream_same_outcome() {
        let run = || {
            let (mut world, mut agents) = setup(vec![2, 2, 2, 2]);
            let mut rng = StdRng::seed_from_u64(77);
            act(
                &mut agents,
                &[
                    Action::Attack(1),
                    Action::Attack(0),
                    Action::Accept(3),
                    Action::Propose(2),
                ],
            );
            resolve_tick(&mut world, &mut agents, &CombatConfig::default(), &mut rng);
            let rewards: Vec<f64> = agents.iter().map(|a| a.state().reward).collect();
            let partners: Vec<_> = agents.iter().map(|a| a.state().alliance_partner).collect();
            (world.current().clone(), rewards, partners)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_attacking_partner_is_penalized() {
        let (mut world, mut agents) = setup(vec![2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(10);
        let combat = CombatConfig {
            notunderattack_attack_prob: 0.0,
            ..CombatConfig::default()
        };
        ally(&mut agents, 0, 1, combat.alliance_status_weight);
        act(&mut agents, &[Action::Attack(1), Action::Defend, Action::Defend]);
        resolve_tick(&mut world, &mut agents, &combat, &mut rng);

        // own 2 + ally 2 + 1 / 2 for the target, minus the penalty
        let expected = 4.5 - combat.attack_alliance_member_penalty;
        assert!((agents[0].state().reward - expected).abs() < 1e-12);
        assert_eq!(agents[0].state().alliance_partner, Some(1));
    }

    #[test]
    fn test_proposing_to_partner_is_penalized() {
        let (mut world, mut agents) = setup(vec![2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(11);
        let combat = CombatConfig::default();
        ally(&mut agents, 0, 1, combat.alliance_status_weight);
        act(&mut agents, &[Action::Propose(1), Action::Defend, Action::Defend]);
        resolve_tick(&mut world, &mut agents, &combat, &mut rng);

        let expected = 4.0 - combat.propose_alliance_member_penalty;
        assert!((agents[0].state().reward - expected).abs() < 1e-12);
    }

    #[test]
    fn test_defending_under_attack() {
        let actions = [Action::Defend, Action::Attack(0)];
        let quiet = CombatConfig {
            notunderattack_attack_prob: 0.0,
            ..CombatConfig::default()
        };

        // 1.0 * 2 * 1.0 / 2
        let certain = CombatConfig {
            baseline_att_prob: 1.0,
            baseline_def_prob: 1.0,
            ..quiet.clone()
        };
        assert_eq!(health_after(vec![2, 2], &actions, &certain), vec![1, 2]);

        let impenetrable = CombatConfig {
            baseline_att_prob: 1.0,
            baseline_def_prob: 0.0,
            ..quiet
        };
        assert_eq!(health_after(vec![2, 2], &actions, &impenetrable), vec![2, 2]);
    }

    #[test]
    fn test_recovering_under_attack() {
        let actions = [Action::Recover, Action::Attack(0)];
        let quiet = CombatConfig {
            notunderattack_attack_prob: 0.0,
            baseline_recover_prob: 1.0,
            ..CombatConfig::default()
        };

        // 1.0 * 1.0 / 1
        let certain = CombatConfig {
            baseline_att_prob: 1.0,
            ..quiet.clone()
        };
        assert_eq!(health_after(vec![1, 1], &actions, &certain), vec![2, 1]);

        let blocked = CombatConfig {
            baseline_att_prob: 0.0,
            ..quiet
        };
        assert_eq!(health_after(vec![1, 1], &actions, &blocked), vec![1, 1]);
    }

    #[test]
    fn test_attacking_under_attack() {
        let actions = [Action::Attack(1), Action::Attack(0)];
        // seat 0: 1.0 * 2 * 1.0, seat 1 after the first hit: 1.0 * 1 * 1.0
        let certain = CombatConfig {
            baseline_att_prob: 1.0,
            underattack_attack_multiplier: 1.0,
            ..CombatConfig::default()
        };
        assert_eq!(health_after(vec![2, 2], &actions, &certain), vec![1, 1]);

        let harmless = CombatConfig {
            baseline_att_prob: 0.0,
            ..CombatConfig::default()
        };
        assert_eq!(health_after(vec![2, 2], &actions, &harmless), vec![2, 2]);
    }

    #[test]
    fn test_proposing_under_attack() {
        let actions = [Action::Propose(1), Action::Attack(0)];
        let quiet = CombatConfig {
            notunderattack_attack_prob: 0.0,
            ..CombatConfig::default()
        };

        // 0.5 * 2
        let certain = CombatConfig {
            baseline_att_prob: 0.5,
            ..quiet.clone()
        };
        assert_eq!(health_after(vec![2, 2], &actions, &certain), vec![1, 2]);

        let harmless = CombatConfig {
            baseline_att_prob: 0.0,
            ..quiet
        };
        assert_eq!(health_after(vec![2, 2], &actions, &harmless), vec![2, 2]);
    }

    /// Whether seat 0 accepts seat 1's proposal at the given animosity
    fn accept_forms(animosity: u8, combat: &CombatConfig, rng: &mut StdRng) -> bool {
        let (mut world, mut agents) = setup_with_animosity(vec![2, 2], animosity);
        act(&mut agents, &[Action::Accept(1), Action::Propose(0)]);
        resolve_tick(&mut world, &mut agents, combat, rng);
        agents[0].state().alliance_partner == Some(1)
    }

    #[test]
    fn test_acceptance_scales_with_animosity() {
        let mut rng = StdRng::seed_from_u64(12);
        let fixed = CombatConfig {
            animosity_decrease_prob_alliance_proposal: 0.0,
            alliance_prob_with_no_animosity: 0.0,
            ..CombatConfig::default()
        };

        let certain_at_one = CombatConfig {
            alliance_prob_with_some_animosity_baseline: 1.0,
            ..fixed.clone()
        };
        assert!(accept_forms(1, &certain_at_one, &mut rng));

        // 2.0 / 2
        let certain_at_two = CombatConfig {
            alliance_prob_with_some_animosity_baseline: 2.0,
            ..fixed.clone()
        };
        assert!(accept_forms(2, &certain_at_two, &mut rng));

        let never = CombatConfig {
            alliance_prob_with_some_animosity_baseline: 0.0,
            ..fixed.clone()
        };
        assert!(!accept_forms(1, &never, &mut rng));
    }

    #[test]
    fn test_acceptance_rate_at_high_animosity() {
        let mut rng = StdRng::seed_from_u64(13);
        let combat = CombatConfig {
            animosity_decrease_prob_alliance_proposal: 0.0,
            ..CombatConfig::default()
        };
        let trials = 4000;
        let formed = (0..trials)
            .filter(|_| accept_forms(2, &combat, &mut rng))
            .count();

        // 0.6 / 2
        let rate = formed as f64 / trials as f64;
        assert!((rate - 0.3).abs() < 0.04, "rate {rate}");
    }
}
