//! Power-up pickup and effects

use super::physics::PhysicsWorld;
use super::state::{GameEvent, GameSession, PowerUpKind, Sound};
use crate::settings::Tuning;

/// Collect every falling power-up that overlaps the paddle and apply it.
/// Returns the kinds collected this frame.
pub fn collect_powerups(
    session: &mut GameSession,
    world: &mut PhysicsWorld,
    tuning: &Tuning,
) -> Vec<PowerUpKind> {
    let paddle = session.paddle.rect();
    let mut collected = Vec::new();
    session.powerups.retain(|p| {
        if p.rect.intersects(&paddle) {
            collected.push(p.kind);
            false
        } else {
            true
        }
    });

    for &kind in &collected {
        session.play(Sound::PowerUp);
        apply_powerup(kind, session, world, tuning);
        session.emit(GameEvent::PowerUpCollected(kind));
        log::debug!("Collected {:?}", kind);
    }
    collected
}

/// Apply a power-up's effect to the session
pub fn apply_powerup(
    kind: PowerUpKind,
    session: &mut GameSession,
    world: &mut PhysicsWorld,
    tuning: &Tuning,
) {
    match kind {
        PowerUpKind::Ball => session.spawn_launched_ball(world, tuning),
        PowerUpKind::Bomb => {
            for ball in &mut session.balls {
                ball.is_bomb = true;
            }
        }
        PowerUpKind::Gold => session.score += tuning.gold_bonus,
        PowerUpKind::Shot => session.ammo = tuning.shot_ammo,
        PowerUpKind::BallMulti => {
            for _ in 0..tuning.multi_ball_count {
                session.spawn_launched_ball(world, tuning);
            }
        }
        PowerUpKind::Life => session.lives += 1,
        PowerUpKind::Grow => {
            // Does not stack
            if !session.grow_active {
                session.grow_active = true;
                let width = session.paddle.base_width * tuning.grow_factor;
                session.paddle.resize(world, width);
            }
        }
    }
}
