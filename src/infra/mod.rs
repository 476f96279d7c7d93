mod composite_observer;
mod config;
mod default_observer;
mod error;
mod game_observer;
mod tick_recorder;
mod types;

pub use composite_observer::CompositeObserver;
pub use config::{CombatConfig, LearningConfig, SimConfig};
pub use default_observer::DefaultObserver;
pub use error::{SimError, SimResult};
pub use game_observer::SimObserver;
pub use tick_recorder::TickRecorder;
pub use types::{ActionId, AgentId, AnimosityProfile, EstimatorKind, HealthProfile, PolicyKind};
