//! Contact classification and dispatch
//!
//! The physics step reports contacts as unordered pairs of body tags. They are
//! normalized into a [`ContactPair`] and routed to a handler. Handlers mutate
//! the session (score, hit points, collections) and queue bodies for
//! destruction; they never remove bodies from the world themselves.
//!
//! A pair is acted on at most once: every handler first checks that the
//! entities involved are still live (present in their collection and not
//! queued for destruction).

use super::destruction::DestructionQueue;
use super::physics::{Contact, EntityKind};
use super::state::{EntityId, GameEvent, GameSession, Sound};
use crate::settings::Tuning;

/// A contact normalized to the pairs gameplay cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPair {
    BallBrick { ball: EntityId, brick: EntityId },
    BallFloor { ball: EntityId },
    BulletBrick { bullet: EntityId, brick: EntityId },
    Ignored,
}

/// Classify an unordered pair of tags
pub fn classify(a: EntityKind, b: EntityKind) -> ContactPair {
    use EntityKind::*;

    match (a, b) {
        (Ball(ball), Brick(brick)) | (Brick(brick), Ball(ball)) => {
            ContactPair::BallBrick { ball, brick }
        }
        (Ball(ball), Floor) | (Floor, Ball(ball)) => ContactPair::BallFloor { ball },
        (Bullet(bullet), Brick(brick)) | (Brick(brick), Bullet(bullet)) => {
            ContactPair::BulletBrick { bullet, brick }
        }
        _ => ContactPair::Ignored,
    }
}

/// Route one contact to its handler
pub fn dispatch(
    session: &mut GameSession,
    queue: &mut DestructionQueue,
    contact: Contact,
    tuning: &Tuning,
) {
    match classify(contact.a, contact.b) {
        ContactPair::BallBrick { ball, brick } => ball_hits_brick(session, queue, ball, brick, tuning),
        ContactPair::BallFloor { ball } => ball_hits_floor(session, queue, ball),
        ContactPair::BulletBrick { bullet, brick } => {
            bullet_hits_brick(session, queue, bullet, brick, tuning)
        }
        ContactPair::Ignored => {}
    }
}

fn ball_hits_brick(
    session: &mut GameSession,
    queue: &mut DestructionQueue,
    ball_id: EntityId,
    brick_id: EntityId,
    tuning: &Tuning,
) {
    if !session.brick_is_live(brick_id, queue) {
        return;
    }
    let Some(index) = session.balls.iter().position(|b| b.id == ball_id) else {
        return;
    };

    if session.balls[index].is_bomb {
        // One blast per bomb; the explosion never touches other balls
        session.balls[index].is_bomb = false;
        session.explode(brick_id, queue, tuning);
    } else {
        session.hit_brick(brick_id, queue, tuning);
    }
    session.score += tuning.brick_score;
}

fn bullet_hits_brick(
    session: &mut GameSession,
    queue: &mut DestructionQueue,
    bullet_id: EntityId,
    brick_id: EntityId,
    tuning: &Tuning,
) {
    // The bullet may have left the field earlier in the frame
    let Some(index) = session.bullets.iter().position(|b| b.id == bullet_id) else {
        return;
    };
    if !session.brick_is_live(brick_id, queue) {
        return;
    }

    let bullet = session.bullets.remove(index);
    queue.enqueue(bullet.body);
    session.hit_brick(brick_id, queue, tuning);
    session.score += tuning.brick_score;
}

fn ball_hits_floor(session: &mut GameSession, queue: &mut DestructionQueue, ball_id: EntityId) {
    let Some(index) = session.balls.iter().position(|b| b.id == ball_id) else {
        return;
    };
    let ball = session.balls.remove(index);
    queue.enqueue(ball.body);
    log::debug!("Ball {} fell out", ball_id);

    if !session.balls.is_empty() {
        return;
    }

    session.lives -= 1;
    session.play(Sound::BallLost);
    if session.grow_active {
        session.grow_active = false;
        session.resize_pending = true;
    }
    session.emit(GameEvent::BallLost {
        lives: session.lives,
    });
    log::info!("Last ball lost, {} lives left", session.lives);

    if session.lives > 0 {
        session.spawn_ball_pending = true;
    }
}
