use crate::game::TerminationReason;
use crate::infra::{SimConfig, SimObserver};
use crate::planners::rl::{Arena, LearningCore};

pub struct CompositeObserver {
    observers: Vec<Box<dyn SimObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn SimObserver>>) -> Self {
        Self { observers }
    }
}

impl SimObserver for CompositeObserver {
    fn on_simulation_start(&mut self, config: &SimConfig, training_budget: usize) {
        for observer in &mut self.observers {
            observer.on_simulation_start(config, training_budget);
        }
    }

    fn on_subgame_finished(&mut self, index: usize, ticks: usize, arena: &Arena) {
        for observer in &mut self.observers {
            observer.on_subgame_finished(index, ticks, arena);
        }
    }

    fn on_tick(&mut self, tick: usize, arena: &Arena) {
        for observer in &mut self.observers {
            observer.on_tick(tick, arena);
        }
    }

    fn on_terminated(&mut self, reason: TerminationReason, ticks: usize, arena: &Arena) {
        for observer in &mut self.observers {
            observer.on_terminated(reason, ticks, arena);
        }
    }

    fn on_model_ready(&mut self, learner: &LearningCore) {
        for observer in &mut self.observers {
            observer.on_model_ready(learner);
        }
    }
}
