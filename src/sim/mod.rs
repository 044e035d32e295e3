//! Simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Bodies are torn down through the destruction queue, never mid-step
//! - No rendering or platform dependencies

pub mod collision;
pub mod destruction;
pub mod physics;
pub mod powerups;
pub mod rect;
pub mod state;
pub mod tick;

pub use collision::{ContactPair, classify, dispatch};
pub use destruction::{BodyTeardown, DestructionQueue};
pub use physics::{BodyFlags, BodyHandle, Contact, EntityKind, PhysicsWorld, Shape};
pub use powerups::{apply_powerup, collect_powerups};
pub use rect::Rect;
pub use state::{
    Ball, BallState, Brick, Bullet, EntityId, GameEvent, GameSession, Metrics, Paddle, Particle,
    PowerUp, PowerUpKind, Sound, clamp_speed,
};
pub use tick::{Game, Mode, TickInput};
