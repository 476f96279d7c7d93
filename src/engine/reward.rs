//! Per-seat reward, computed from the seat's own beliefs after a tick

use crate::infra::{AgentId, CombatConfig};
use crate::planners::Action;
use crate::state::SeatState;

/// `own health + ally health + opponent term + extra`, all by belief.
/// `extra` carries the penalties collected while resolving the tick.
pub fn compute_reward(
    id: AgentId,
    seat: &SeatState,
    action: Option<Action>,
    health_granularity: f64,
    combat: &CombatConfig,
    extra: f64,
) -> f64 {
    let belief = |agent: AgentId| f64::from(seat.health_belief[agent]) * health_granularity;

    let own = belief(id);
    let ally = seat.alliance_partner.map_or(0.0, belief);
    let opponent = match action {
        Some(Action::Attack(target)) if target != id => {
            let health = belief(target);
            if health > 0.0 {
                1.0 / health
            } else {
                combat.dead_target_reward
            }
        }
        _ => 0.0,
    };

    own + ally + opponent + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(health: &[u32], partner: Option<AgentId>) -> SeatState {
        let mut seat = SeatState::new(0, health);
        seat.alliance_partner = partner;
        seat
    }

    #[test]
    fn test_attack_on_living_target() {
        let combat = CombatConfig::default();
        let seat = seat(&[2, 2, 1], None);
        let reward = compute_reward(0, &seat, Some(Action::Attack(2)), 1.0, &combat, 0.0);
        assert!((reward - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_attack_on_believed_dead_target() {
        let combat = CombatConfig::default();
        let seat = seat(&[2, 0, 2], None);
        let reward = compute_reward(0, &seat, Some(Action::Attack(1)), 1.0, &combat, -0.2);
        assert!((reward - (2.0 - 0.1 - 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_ally_health_counts() {
        let combat = CombatConfig::default();
        let seat = seat(&[4, 2, 4], Some(2));
        let reward = compute_reward(0, &seat, Some(Action::Defend), 0.5, &combat, 0.0);
        assert!((reward - 4.0).abs() < 1e-12);
    }
}
