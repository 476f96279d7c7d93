//! Exact Q-table over every discretized state
//!
//! A state is the health step of every agent plus an allied flag. The table
//! is laid out row-major: one row of `3N+2` action values per state.

use std::io::{self, Write};

use crate::infra::{ActionId, SimConfig, SimError, SimResult};
use crate::planners::action_count;
use crate::state::BASELINE_ALLIANCE_STATUS;

use super::replay::Experience;

/// Largest state enumeration the tabular estimator accepts
pub const MAX_TABULAR_STATES: u128 = 2_000_000;

#[derive(Debug, Clone)]
pub struct QTable {
    num_agents: usize,
    num_actions: usize,
    max_steps: u32,
    health_granularity: f64,
    alpha: f64,
    discount: f64,
    values: Vec<f32>,
}

impl QTable {
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let max_steps = config.max_health_steps();
        let states = Self::state_count(config.num_agents, max_steps);
        if states > MAX_TABULAR_STATES {
            return Err(SimError::StateSpaceTooLarge {
                states,
                limit: MAX_TABULAR_STATES,
            });
        }

        let num_actions = action_count(config.num_agents);
        Ok(Self {
            num_agents: config.num_agents,
            num_actions,
            max_steps,
            health_granularity: config.health_granularity,
            alpha: config.learning.alpha,
            discount: config.learning.discount,
            values: vec![0.0; states as usize * num_actions],
        })
    }

    /// `(max_steps + 1)^n * 2`, saturating
    pub fn state_count(num_agents: usize, max_steps: u32) -> u128 {
        let base = u128::from(max_steps) + 1;
        (0..num_agents)
            .try_fold(2u128, |acc, _| acc.checked_mul(base))
            .unwrap_or(u128::MAX)
    }

    pub fn num_states(&self) -> usize {
        self.values.len() / self.num_actions
    }

    /// Row of the table for an observation feature vector
    pub fn state_index(&self, features: &[f32]) -> usize {
        let base = self.max_steps as usize + 1;
        let health_index = features
            .iter()
            .take(self.num_agents)
            .rev()
            .fold(0usize, |acc, health| acc * base + self.health_step(*health));
        let status = features.get(self.num_agents).copied().unwrap_or(1.0);
        let allied = (f64::from(status) - BASELINE_ALLIANCE_STATUS).abs() > 1e-6;
        health_index * 2 + usize::from(allied)
    }

    fn health_step(&self, health: f32) -> usize {
        let steps = (f64::from(health) / self.health_granularity).round();
        steps.clamp(0.0, f64::from(self.max_steps)) as usize
    }

    pub fn values(&self, features: &[f32]) -> &[f32] {
        let start = self.state_index(features) * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    pub fn value(&self, features: &[f32], action: ActionId) -> f32 {
        self.values(features)[action]
    }

    /// Apply the one-step Q-learning rule; returns the temporal difference
    pub fn update(&mut self, experience: &Experience) -> f32 {
        let best_next = self
            .values(&experience.next_state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let target = f64::from(experience.reward) + self.discount * f64::from(best_next);

        let slot = self.state_index(&experience.state) * self.num_actions + experience.action;
        let current = f64::from(self.values[slot]);
        let updated = (1.0 - self.alpha) * current + self.alpha * target;
        self.values[slot] = updated as f32;
        (target - current) as f32
    }

    /// One line per visited state: the state index followed by its action values
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(
            writer,
            "# agents={} actions={} max_steps={}",
            self.num_agents, self.num_actions, self.max_steps
        )?;
        for (state, row) in self.values.chunks(self.num_actions).enumerate() {
            if row.iter().all(|v| *v == 0.0) {
                continue;
            }
            let values: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            writeln!(writer, "{state} {}", values.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> QTable {
        QTable::new(&SimConfig::for_agents(3)).unwrap()
    }

    #[test]
    fn test_enumerates_all_states() {
        let table = table();
        assert_eq!(table.num_states(), 54);
        assert_eq!(table.values(&[2.0, 2.0, 2.0, 1.0]).len(), 11);
    }

    #[test]
    fn test_distinct_states_have_distinct_rows() {
        let table = table();
        let a = table.state_index(&[2.0, 1.0, 0.0, 1.0]);
        let b = table.state_index(&[0.0, 1.0, 2.0, 1.0]);
        let c = table.state_index(&[2.0, 1.0, 0.0, 1.5]);
        assert_ne!(a, b);
        assert_eq!(c, a + 1);
        assert!(a < table.num_states() && b < table.num_states());
    }

    #[test]
    fn test_update_moves_toward_target() {
        let mut table = table();
        let experience = Experience {
            state: vec![2.0, 2.0, 2.0, 1.0],
            action: 1,
            reward: 1.0,
            next_state: vec![2.0, 1.0, 2.0, 1.0],
            done: false,
        };
        table.update(&experience);
        assert!((table.value(&experience.state, 1) - 0.1).abs() < 1e-6);
        table.update(&experience);
        assert!((table.value(&experience.state, 1) - 0.19).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_oversized_state_space() {
        let mut config = SimConfig::for_agents(12);
        config.max_health = 10.0;
        assert!(matches!(
            QTable::new(&config),
            Err(SimError::StateSpaceTooLarge { .. })
        ));
    }
}
