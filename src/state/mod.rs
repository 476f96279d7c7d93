mod agent_state;
mod animosity;
mod committed;
mod world_state;

pub use agent_state::{Agent, BASELINE_ALLIANCE_STATUS, PROPOSAL_HISTORY_LEN, SeatState};
pub use animosity::{AnimosityMatrix, MAX_ANIMOSITY};
pub use committed::Committed;
pub use world_state::{WorldSnapshot, WorldState, starting_health};
