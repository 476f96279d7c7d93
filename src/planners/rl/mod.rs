//! Value-based learning for the Learned seats
//!
//! Every Learned seat holds a handle to one shared [`LearningCore`]:
//!
//! ```text
//! Arena::step
//!     │  observation features
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  LearnedPolicy (per seat)                                   │
//! │  - warm-up / epsilon exploration                            │
//! │  - masked arg-max, near-greedy top-3 noise                  │
//! └─────────────────────────────────────────────────────────────┘
//!     │  evaluate / learn
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  LearningCore (shared)                                      │
//! │  - Tabular: QTable, immediate one-step update               │
//! │  - Network (feature `rl`): DqnLearner, replay + target net  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod env;
pub mod learned;
pub mod metrics;
pub mod replay;
pub mod tabular;

#[cfg(feature = "rl")]
pub mod policy;
#[cfg(feature = "rl")]
pub mod train;

pub use self::core::{LearningCore, SharedLearner};
pub use env::{Arena, Signature, StepResult};
pub use learned::LearnedPolicy;
pub use metrics::{MovingAverage, TrainingMetrics};
pub use replay::{Experience, ReplayBuffer};
pub use tabular::{MAX_TABULAR_STATES, QTable};

#[cfg(feature = "rl")]
pub use policy::QNetwork;
#[cfg(feature = "rl")]
pub use train::{DqnLearner, TrainBackend};
