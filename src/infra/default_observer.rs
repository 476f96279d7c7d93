use tracing::{debug, info};

use crate::game::TerminationReason;
use crate::infra::{SimConfig, SimObserver};
use crate::planners::rl::{Arena, LearningCore};

/// Logs simulation events through `tracing`
pub struct DefaultObserver;

impl SimObserver for DefaultObserver {
    fn on_simulation_start(&mut self, config: &SimConfig, training_budget: usize) {
        info!("Simulation started with {} agents", config.num_agents);
        let policies: Vec<&str> = config.policies.iter().map(|p| p.as_str()).collect();
        info!("- policies: {}", policies.join(", "));
        info!("- estimator: {:?}", config.estimator);
        info!("- health profile: {:?}", config.health_profile);
        info!("- animosity profile: {:?}", config.animosity_profile);
        info!("- seed: {}", config.seed);
        info!(
            "- training: {} sub-games of up to {} ticks",
            training_budget, config.max_iteration
        );
    }

    fn on_tick(&mut self, tick: usize, arena: &Arena) {
        let world = arena.world();
        let agents: Vec<String> = arena
            .agents()
            .iter()
            .map(|agent| {
                let partner = agent
                    .state()
                    .alliance_partner
                    .map_or_else(|| "-".to_string(), |p| p.to_string());
                format!(
                    "{}:{}{:.1}/{}",
                    agent.id(),
                    if world.is_alive(agent.id()) { "" } else { "x" },
                    world.health_value(agent.id()),
                    partner
                )
            })
            .collect();
        debug!("tick: {}, agents: [{}]", tick, agents.join(" "));
    }

    fn on_terminated(&mut self, reason: TerminationReason, ticks: usize, arena: &Arena) {
        info!("Simulation finished: {}", reason);
        info!("Final tick: {}", ticks);
        info!("Survivors: {:?}", arena.alive_ids());
    }

    fn on_model_ready(&mut self, learner: &LearningCore) {
        info!("Learned parameters ready: {:?}", learner);
    }
}
