pub mod engine;
pub mod game;
pub mod infra;
pub mod planners;
pub mod state;

// Re-export commonly used types for convenience
pub use game::{Phase, Simulation, SimulationSummary, TerminationReason};
pub use infra::{SimConfig, SimError, SimResult};
pub use planners::rl::{Arena, LearningCore, SharedLearner};
