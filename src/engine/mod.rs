mod reward;
mod transition;

pub use reward::compute_reward;
pub use transition::resolve_tick;
