use crate::game::TerminationReason;
use crate::infra::SimConfig;
use crate::planners::rl::{Arena, LearningCore};

/// Trait for observing simulation events
pub trait SimObserver {
    /// Called once, before the first training sub-game
    fn on_simulation_start(&mut self, config: &SimConfig, training_budget: usize);

    /// Called when a training sub-game ends, before it is rolled back
    fn on_subgame_finished(&mut self, _index: usize, _ticks: usize, _arena: &Arena) {
        // Default implementation does nothing
    }

    /// Called after every committed evaluation tick
    fn on_tick(&mut self, tick: usize, arena: &Arena);

    /// Called when the evaluation episode ends
    fn on_terminated(&mut self, reason: TerminationReason, ticks: usize, arena: &Arena);

    /// Called once per run with the trained shared parameters
    fn on_model_ready(&mut self, _learner: &LearningCore) {}
}
