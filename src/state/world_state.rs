use rand::Rng;

use crate::infra::{AgentId, HealthProfile, SimConfig};

use super::animosity::AnimosityMatrix;
use super::committed::Committed;

/// Ground truth shared by all seats
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    /// Health per agent, in granularity steps
    pub health: Vec<u32>,
    pub alive: Vec<bool>,
    pub animosity: AnimosityMatrix,
}

#[derive(Debug, Clone)]
pub struct WorldState {
    snapshot: Committed<WorldSnapshot>,
    max_health_steps: u32,
    health_granularity: f64,
}

/// Starting health of every seat, in granularity steps
pub fn starting_health<R: Rng + ?Sized>(
    profile: HealthProfile,
    num_agents: usize,
    max_steps: u32,
    rng: &mut R,
) -> Vec<u32> {
    let low = (max_steps / 2).max(1);
    (0..num_agents)
        .map(|i| match profile {
            HealthProfile::Full => max_steps,
            HealthProfile::Low => low,
            HealthProfile::Random => rng.random_range(1..=max_steps),
            HealthProfile::HalfLow => {
                // odd counts round the low half up
                if 2 * i < num_agents {
                    low
                } else {
                    max_steps
                }
            }
        })
        .collect()
}

impl WorldState {
    pub fn new(health: Vec<u32>, animosity: AnimosityMatrix, config: &SimConfig) -> Self {
        let alive = health.iter().map(|h| *h > 0).collect();
        Self {
            snapshot: Committed::new(WorldSnapshot {
                health,
                alive,
                animosity,
            }),
            max_health_steps: config.max_health_steps(),
            health_granularity: config.health_granularity,
        }
    }

    /// Build the initial world from the configured health and animosity profiles
    pub fn from_config<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let health = starting_health(
            config.health_profile,
            config.num_agents,
            config.max_health_steps(),
            rng,
        );
        let animosity = AnimosityMatrix::new(config.num_agents, config.animosity_profile, rng);
        Self::new(health, animosity, config)
    }

    pub fn num_agents(&self) -> usize {
        self.current().health.len()
    }

    pub fn current(&self) -> &WorldSnapshot {
        self.snapshot.current()
    }

    pub fn stable(&self) -> &WorldSnapshot {
        self.snapshot.stable()
    }

    pub fn health(&self, id: AgentId) -> u32 {
        self.current().health[id]
    }

    pub fn health_steps(&self) -> &[u32] {
        &self.current().health
    }

    /// Health of `id` in real units
    pub fn health_value(&self, id: AgentId) -> f64 {
        f64::from(self.health(id)) * self.health_granularity
    }

    pub fn health_granularity(&self) -> f64 {
        self.health_granularity
    }

    pub fn max_health_steps(&self) -> u32 {
        self.max_health_steps
    }

    pub fn is_alive(&self, id: AgentId) -> bool {
        self.current().alive[id]
    }

    pub fn alive_count(&self) -> usize {
        self.current().alive.iter().filter(|a| **a).count()
    }

    pub fn animosity(&self) -> &AnimosityMatrix {
        &self.current().animosity
    }

    pub fn animosity_mut(&mut self) -> &mut AnimosityMatrix {
        &mut self.snapshot.current_mut().animosity
    }

    /// Remove one health step from `id`. Returns `true` if the agent died.
    pub fn damage(&mut self, id: AgentId) -> bool {
        let world = self.snapshot.current_mut();
        world.health[id] = world.health[id].saturating_sub(1);
        if world.health[id] == 0 && world.alive[id] {
            world.alive[id] = false;
            return true;
        }
        false
    }

    /// Add one health step to a living agent, capped at the maximum
    pub fn heal(&mut self, id: AgentId) {
        let max = self.max_health_steps;
        let world = self.snapshot.current_mut();
        if world.alive[id] && world.health[id] < max {
            world.health[id] += 1;
        }
    }

    pub fn commit(&mut self) {
        self.snapshot.commit();
    }

    pub fn rollback(&mut self) {
        self.snapshot.rollback();
    }
}
