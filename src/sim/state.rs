//! Game session state and entity types
//!
//! Everything a running game owns lives in [`GameSession`]. Entities hold
//! non-owning [`BodyHandle`]s into the physics world; removing an entity means
//! queueing its body, never destroying it directly.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::destruction::DestructionQueue;
use super::physics::{BodyFlags, BodyHandle, EntityKind, PhysicsWorld, Shape};
use super::rect::Rect;
use super::tick::Mode;
use crate::assets::AssetProvider;
use crate::consts::*;
use crate::levels::Grid;
use crate::settings::Tuning;
use crate::to_world;

pub type EntityId = u32;

/// Brick sprite by hit points (1-based)
pub const BRICK_SPRITES: [&str; 8] = [
    "brick",
    "brick_blue",
    "brick_gold",
    "brick_green",
    "brick_orange",
    "brick_purple",
    "brick_black",
    "brick_silver",
];

/// Particle colour by hit points (1-based)
pub const PARTICLE_COLORS: [&str; 8] = [
    "red", "blue", "yellow", "green", "orange", "purple", "black", "silver",
];

/// Sound cues the simulation asks the asset provider to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sound {
    BallLost,
    BrickBreak,
    Launch,
    BrickHit,
    PowerUp,
    GameStart,
    Shot,
}

impl Sound {
    pub fn asset_name(&self) -> &'static str {
        match self {
            Sound::BallLost => "sfx-01",
            Sound::BrickBreak => "sfx-01b",
            Sound::Launch => "sfx-02",
            Sound::BrickHit => "sfx-05",
            Sound::PowerUp => "sfx-06",
            Sound::GameStart => "sfx-08",
            Sound::Shot => "sfx-09",
        }
    }
}

/// Things that happened during a frame, for the frontend
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(Sound),
    /// Pointer grabbed and hidden (true) or released and shown (false)
    PointerCapture(bool),
    BrickDestroyed { id: EntityId, position: Vec2 },
    PowerUpCollected(PowerUpKind),
    BallLost { lives: i32 },
    LevelCleared { level: usize },
    ModeChanged(Mode),
}

/// Sprite sizes (pixels) the simulation derives geometry from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub paddle: Vec2,
    pub ball: Vec2,
    pub brick: Vec2,
    pub bullet: Vec2,
    pub powerup: Vec2,
}

impl Metrics {
    pub fn from_assets<A: AssetProvider + ?Sized>(assets: &A) -> Self {
        Self {
            paddle: assets.get_image("paddle").size(),
            ball: assets.get_image("ball").size(),
            brick: assets.get_image("brick").size(),
            bullet: assets.get_image("bullet").size(),
            powerup: assets.get_image(PowerUpKind::Ball.sprite()).size(),
        }
    }
}

/// Clamp a velocity's magnitude into `[min, max]`. A zero velocity is left alone.
pub fn clamp_speed(velocity: Vec2, min: f32, max: f32) -> Vec2 {
    let speed = velocity.length();
    if speed > max {
        velocity * (max / speed)
    } else if speed > 0.0 && speed < min {
        velocity * (min / speed)
    } else {
        velocity
    }
}

/// Ball state - resting on the paddle or in play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallState {
    /// Slaved to the paddle, waiting for launch
    OnPaddle,
    Moving,
}

#[derive(Debug, Clone)]
pub struct Ball {
    pub id: EntityId,
    pub body: BodyHandle,
    pub state: BallState,
    pub is_bomb: bool,
    /// Sprite size in pixels
    pub size: Vec2,
}

impl Ball {
    pub fn sprite(&self) -> &'static str {
        if self.is_bomb { "ball_bomb" } else { "ball" }
    }

    /// Center position flush above the paddle (pixels)
    fn rest_position(&self, paddle: &Paddle) -> Vec2 {
        Vec2::new(paddle.x, paddle.rect().top() - self.size.y / 2.0)
    }

    /// Put the ball back on the paddle, motionless
    pub fn reset(&mut self, world: &mut PhysicsWorld, paddle: &Paddle) {
        self.state = BallState::OnPaddle;
        world.set_linear_velocity(self.body, Vec2::ZERO);
        world.set_angular_velocity(self.body, 0.0);
        world.set_position(self.body, self.rest_position(paddle) / PPM);
    }

    /// Kick the ball off the paddle. Returns false if it was already moving.
    pub fn launch(&mut self, world: &mut PhysicsWorld, rng: &mut Pcg32, tuning: &Tuning) -> bool {
        if self.state != BallState::OnPaddle {
            return false;
        }
        self.state = BallState::Moving;
        let spread = tuning.launch_impulse_x.abs();
        let impulse = Vec2::new(rng.random_range(-spread..=spread), tuning.launch_impulse_y);
        world.apply_impulse(self.body, impulse);
        if let Some(velocity) = world.linear_velocity(self.body) {
            let clamped = clamp_speed(velocity, tuning.min_ball_speed, tuning.max_ball_speed);
            world.set_linear_velocity(self.body, clamped);
        }
        true
    }

    pub fn update(&mut self, world: &mut PhysicsWorld, paddle: &Paddle, tuning: &Tuning) {
        match self.state {
            BallState::OnPaddle => {
                world.set_position(self.body, self.rest_position(paddle) / PPM);
                world.set_linear_velocity(self.body, Vec2::ZERO);
            }
            BallState::Moving => {
                if let Some(velocity) = world.linear_velocity(self.body) {
                    let clamped =
                        clamp_speed(velocity, tuning.min_ball_speed, tuning.max_ball_speed);
                    if clamped != velocity {
                        world.set_linear_velocity(self.body, clamped);
                    }
                }
            }
        }
    }

    /// Center position in pixels
    pub fn position(&self, world: &PhysicsWorld) -> Option<Vec2> {
        world.position(self.body).map(|p| p * PPM)
    }
}

/// Trapezoid with the full width on top and a narrower bottom edge
fn paddle_shape(width: f32, height: f32) -> Shape {
    let half_top = to_world(width) / 2.0;
    let half_bottom = half_top * PADDLE_TAPER;
    let half_height = to_world(height) / 2.0;
    Shape::Convex(vec![
        Vec2::new(-half_top, -half_height),
        Vec2::new(half_top, -half_height),
        Vec2::new(half_bottom, half_height),
        Vec2::new(-half_bottom, half_height),
    ])
}

/// The player's paddle
#[derive(Debug, Clone)]
pub struct Paddle {
    pub body: BodyHandle,
    /// Center x (pixels)
    pub x: f32,
    /// Center y (pixels)
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Width without any grow effect
    pub base_width: f32,
}

impl Paddle {
    pub fn spawn(world: &mut PhysicsWorld, size: Vec2) -> Self {
        let x = SCREEN_WIDTH / 2.0;
        let y = SCREEN_HEIGHT - PADDLE_BOTTOM_MARGIN - size.y / 2.0;
        let body = world.create_kinematic_body(
            paddle_shape(size.x, size.y),
            Vec2::new(x, y) / PPM,
            BodyFlags::default(),
            EntityKind::Paddle,
        );
        Self {
            body,
            x,
            y,
            width: size.x,
            height: size.y,
            base_width: size.x,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(Vec2::new(self.x, self.y), self.width, self.height)
    }

    /// Follow the pointer, keeping the paddle inside the field
    pub fn track(&mut self, world: &mut PhysicsWorld, pointer_x: f32) {
        let half = self.width / 2.0;
        self.x = pointer_x.clamp(half, (SCREEN_WIDTH - half).max(half));
        world.move_kinematic(self.body, Vec2::new(self.x, self.y) / PPM);
    }

    /// Replace the collision shape and visual width
    pub fn resize(&mut self, world: &mut PhysicsWorld, new_width: f32) {
        world.replace_shape(
            self.body,
            paddle_shape(new_width, self.height),
            BodyFlags::default(),
        );
        log::debug!("Paddle resized {} -> {}", self.width, new_width);
        self.width = new_width;
    }
}

#[derive(Debug, Clone)]
pub struct Brick {
    pub id: EntityId,
    pub body: BodyHandle,
    pub hp: i32,
    /// Bounds in pixels
    pub rect: Rect,
}

impl Brick {
    pub fn spawn(world: &mut PhysicsWorld, id: EntityId, rect: Rect, hp: i32) -> Self {
        let body = world.create_static_body(
            Shape::Cuboid {
                half_width: to_world(rect.w) / 2.0,
                half_height: to_world(rect.h) / 2.0,
            },
            rect.center() / PPM,
            BodyFlags::default(),
            EntityKind::Brick(id),
        );
        Self { id, body, hp, rect }
    }

    /// Take one hit; true when no hit points are left
    pub fn hit(&mut self) -> bool {
        self.hp -= 1;
        self.hp <= 0
    }

    pub fn sprite(&self) -> &'static str {
        lookup(&BRICK_SPRITES, self.hp)
    }

    pub fn particle_color(&self) -> &'static str {
        lookup(&PARTICLE_COLORS, self.hp)
    }
}

fn lookup(table: &[&'static str; 8], hp: i32) -> &'static str {
    usize::try_from(hp - 1)
        .ok()
        .and_then(|i| table.get(i))
        .copied()
        .unwrap_or(table[0])
}

/// Projectile fired from the paddle
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: EntityId,
    pub body: BodyHandle,
    pub rect: Rect,
}

impl Bullet {
    pub fn spawn(
        world: &mut PhysicsWorld,
        id: EntityId,
        center: Vec2,
        size: Vec2,
        speed: f32,
    ) -> Self {
        let flags = BodyFlags {
            gravity_scale: 0.0,
            ccd: true,
            ..BodyFlags::sensor()
        };
        let body = world.create_dynamic_body(
            Shape::Cuboid {
                half_width: to_world(size.x) / 2.0,
                half_height: to_world(size.y) / 2.0,
            },
            center / PPM,
            flags,
            EntityKind::Bullet(id),
        );
        world.set_linear_velocity(body, Vec2::new(0.0, -speed));
        Self {
            id,
            body,
            rect: Rect::from_center(center, size.x, size.y),
        }
    }

    /// Sync the rect with the body; false once the bullet has left the top
    pub fn update(&mut self, world: &PhysicsWorld) -> bool {
        if let Some(position) = world.position(self.body) {
            self.rect.set_center(position * PPM);
        }
        self.rect.bottom() >= 0.0
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Ball,
    Bomb,
    Gold,
    Shot,
    BallMulti,
    Life,
    Grow,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::Ball,
        PowerUpKind::Bomb,
        PowerUpKind::Gold,
        PowerUpKind::Shot,
        PowerUpKind::BallMulti,
        PowerUpKind::Life,
        PowerUpKind::Grow,
    ];

    pub fn sprite(&self) -> &'static str {
        match self {
            PowerUpKind::Ball => "bonus_ball",
            PowerUpKind::Bomb => "bonus_bomb",
            PowerUpKind::Gold => "bonus_gold",
            PowerUpKind::Shot => "bonus_shot",
            PowerUpKind::BallMulti => "bonus_ballMulti",
            PowerUpKind::Life => "bonus_paddle",
            PowerUpKind::Grow => "bonus_grow",
        }
    }
}

/// Falling pickup; pure rectangle, no physics body
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub rect: Rect,
}

impl PowerUp {
    /// Fall one frame; false once below the bottom of the field
    pub fn update(&mut self, fall_speed: f32) -> bool {
        self.rect.y += fall_speed;
        self.rect.top() <= SCREEN_HEIGHT
    }
}

/// Brick debris, purely cosmetic
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: &'static str,
    /// Frames left
    pub life: u32,
}

impl Particle {
    pub fn update(&mut self) -> bool {
        self.vel.y += PARTICLE_GRAVITY;
        self.pos += self.vel;
        self.life = self.life.saturating_sub(1);
        self.life > 0
    }
}

/// One run from "new game"/"continue" until game over or restart
#[derive(Debug)]
pub struct GameSession {
    pub score: u64,
    pub lives: i32,
    /// Current level index (0-based)
    pub level: usize,
    pub ammo: u32,
    pub grow_active: bool,
    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    pub bricks: Vec<Brick>,
    pub bullets: Vec<Bullet>,
    pub powerups: Vec<PowerUp>,
    pub particles: Vec<Particle>,
    /// A replacement ball spawns at the top of the next frame
    pub spawn_ball_pending: bool,
    /// The paddle shrinks back to its base width after the next step
    pub resize_pending: bool,
    pub pointer_grabbed: bool,
    events: Vec<GameEvent>,
    metrics: Metrics,
    rng: Pcg32,
    next_id: EntityId,
}

impl GameSession {
    /// Create a session with a paddle and one ball resting on it
    pub fn new(
        world: &mut PhysicsWorld,
        metrics: Metrics,
        tuning: &Tuning,
        level: usize,
        seed: u64,
    ) -> Self {
        let paddle = Paddle::spawn(world, metrics.paddle);
        let mut session = Self {
            score: 0,
            lives: tuning.starting_lives,
            level,
            ammo: 0,
            grow_active: false,
            paddle,
            balls: Vec::new(),
            bricks: Vec::new(),
            bullets: Vec::new(),
            powerups: Vec::new(),
            particles: Vec::new(),
            spawn_ball_pending: false,
            resize_pending: false,
            pointer_grabbed: false,
            events: Vec::new(),
            metrics,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        session.spawn_ball(world);
        session
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn play(&mut self, sound: Sound) {
        self.emit(GameEvent::Sound(sound));
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Grab or release the pointer, emitting an event on change
    pub fn set_pointer_grabbed(&mut self, grabbed: bool) {
        if self.pointer_grabbed != grabbed {
            self.pointer_grabbed = grabbed;
            self.emit(GameEvent::PointerCapture(grabbed));
        }
    }

    /// Spawn a ball resting on the paddle and release the pointer
    pub fn spawn_ball(&mut self, world: &mut PhysicsWorld) -> EntityId {
        let id = self.insert_ball(world);
        self.set_pointer_grabbed(false);
        id
    }

    /// Add a ball on the paddle without touching pointer capture
    fn insert_ball(&mut self, world: &mut PhysicsWorld) -> EntityId {
        let id = self.next_entity_id();
        let size = self.metrics.ball;
        let flags = BodyFlags {
            density: 1.0,
            friction: 0.0,
            restitution: 1.0,
            ccd: true,
            ..BodyFlags::default()
        };
        let body = world.create_dynamic_body(
            Shape::Ball {
                radius: to_world(size.x.max(size.y)) / 2.0,
            },
            Vec2::new(self.paddle.x, self.paddle.rect().top()) / PPM,
            flags,
            EntityKind::Ball(id),
        );
        let mut ball = Ball {
            id,
            body,
            state: BallState::OnPaddle,
            is_bomb: false,
            size,
        };
        ball.reset(world, &self.paddle);
        self.balls.push(ball);
        log::debug!("Spawned ball {}", id);
        id
    }

    /// Launch every ball resting on the paddle
    pub fn launch_balls(&mut self, world: &mut PhysicsWorld, tuning: &Tuning) {
        let mut launched = false;
        for ball in &mut self.balls {
            launched |= ball.launch(world, &mut self.rng, tuning);
        }
        if launched {
            self.play(Sound::Launch);
            self.set_pointer_grabbed(true);
        }
    }

    /// Spawn a ball and launch it straight away
    pub fn spawn_launched_ball(&mut self, world: &mut PhysicsWorld, tuning: &Tuning) {
        self.insert_ball(world);
        let launched = match self.balls.last_mut() {
            Some(ball) => ball.launch(world, &mut self.rng, tuning),
            None => false,
        };
        if launched {
            self.play(Sound::Launch);
            self.set_pointer_grabbed(true);
        }
    }

    /// Fire one bullet from the paddle top if there is ammo
    pub fn shoot(&mut self, world: &mut PhysicsWorld, tuning: &Tuning) -> bool {
        if self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        let id = self.next_entity_id();
        let center = Vec2::new(self.paddle.x, self.paddle.rect().top());
        let bullet = Bullet::spawn(world, id, center, self.metrics.bullet, tuning.bullet_speed);
        self.bullets.push(bullet);
        self.play(Sound::Shot);
        true
    }

    /// Queue the current bricks and lay out a new grid
    pub fn load_bricks(&mut self, world: &mut PhysicsWorld, queue: &mut DestructionQueue, grid: &Grid) {
        for brick in self.bricks.drain(..) {
            queue.enqueue(brick.body);
        }

        let Some(first_row) = grid.first() else {
            return;
        };
        let size = self.metrics.brick;
        let columns = first_row.len() as f32;
        let total_width = columns * size.x + (columns - 1.0).max(0.0) * BRICK_GAP;
        let start_x = ((SCREEN_WIDTH - total_width) / 2.0).floor();

        for (row_index, row) in grid.iter().enumerate() {
            for (column, &hp) in row.iter().enumerate() {
                if hp == 0 {
                    continue;
                }
                let x = start_x + column as f32 * (size.x + BRICK_GAP);
                let y = row_index as f32 * (size.y + BRICK_GAP) + BRICK_TOP_OFFSET;
                let id = self.next_entity_id();
                let brick = Brick::spawn(world, id, Rect::new(x, y, size.x, size.y), i32::from(hp));
                self.bricks.push(brick);
            }
        }
        log::debug!("Placed {} bricks", self.bricks.len());
    }

    fn brick_index(&self, id: EntityId) -> Option<usize> {
        self.bricks.iter().position(|b| b.id == id)
    }

    /// Brick is still in play (present and not awaiting destruction)
    pub fn brick_is_live(&self, id: EntityId, queue: &DestructionQueue) -> bool {
        self.brick_index(id)
            .is_some_and(|i| !queue.contains(self.bricks[i].body))
    }

    /// Hit a live brick once. Returns false if the brick is already gone.
    pub fn hit_brick(&mut self, id: EntityId, queue: &mut DestructionQueue, tuning: &Tuning) -> bool {
        if !self.brick_is_live(id, queue) {
            return false;
        }
        let Some(index) = self.brick_index(id) else {
            return false;
        };
        if self.bricks[index].hit() {
            self.destroy_brick(id, queue, tuning);
        } else {
            self.play(Sound::BrickHit);
        }
        true
    }

    /// Break a brick: debris, maybe a power-up, body queued. Runs at most once
    /// per brick.
    pub fn destroy_brick(&mut self, id: EntityId, queue: &mut DestructionQueue, tuning: &Tuning) -> bool {
        let Some(index) = self.brick_index(id) else {
            return false;
        };
        if !queue.enqueue(self.bricks[index].body) {
            return false;
        }
        let brick = self.bricks.remove(index);
        let center = brick.rect.center();

        for _ in 0..tuning.particles_per_brick {
            let vel = Vec2::new(self.rng.random_range(-2.0..=2.0), self.rng.random_range(-5.0..=0.0));
            self.particles.push(Particle {
                pos: center,
                vel,
                color: brick.particle_color(),
                life: PARTICLE_LIFE_FRAMES,
            });
        }

        if self.rng.random::<f32>() < tuning.powerup_drop_chance {
            let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
            let id = self.next_entity_id();
            let size = self.metrics.powerup;
            self.powerups.push(PowerUp {
                id,
                kind,
                rect: Rect::from_center(center, size.x, size.y),
            });
            log::debug!("Brick {} dropped {:?}", brick.id, kind);
        }

        self.play(Sound::BrickBreak);
        self.emit(GameEvent::BrickDestroyed {
            id: brick.id,
            position: center,
        });
        true
    }

    /// Destroy every brick whose bounds meet the hit brick's inflated bounds
    pub fn explode(&mut self, id: EntityId, queue: &mut DestructionQueue, tuning: &Tuning) -> usize {
        let Some(index) = self.brick_index(id) else {
            return 0;
        };
        let margin = tuning.explosion_margin;
        let blast = self.bricks[index].rect.inflate(margin, margin);
        let caught: Vec<EntityId> = self
            .bricks
            .iter()
            .filter(|b| b.rect.intersects(&blast))
            .map(|b| b.id)
            .collect();
        let destroyed = caught
            .into_iter()
            .filter(|&id| self.destroy_brick(id, queue, tuning))
            .count();
        log::debug!("Explosion at brick {} destroyed {}", id, destroyed);
        destroyed
    }

    /// Per-frame entity update after the physics step
    pub fn update_entities(
        &mut self,
        world: &mut PhysicsWorld,
        queue: &mut DestructionQueue,
        tuning: &Tuning,
        pointer_x: Option<f32>,
    ) {
        if let Some(x) = pointer_x {
            self.paddle.track(world, x);
        }

        for ball in &mut self.balls {
            ball.update(world, &self.paddle, tuning);
        }

        self.bullets.retain_mut(|bullet| {
            if bullet.update(world) {
                return true;
            }
            queue.enqueue(bullet.body);
            false
        });

        let fall_speed = tuning.powerup_fall_speed;
        self.powerups.retain_mut(|p| p.update(fall_speed));
        self.particles.retain_mut(|p| p.update());
    }

    /// Queue every body the session owns and empty its collections
    pub fn teardown(&mut self, queue: &mut DestructionQueue) {
        queue.enqueue(self.paddle.body);
        for ball in self.balls.drain(..) {
            queue.enqueue(ball.body);
        }
        for brick in self.bricks.drain(..) {
            queue.enqueue(brick.body);
        }
        for bullet in self.bullets.drain(..) {
            queue.enqueue(bullet.body);
        }
        self.powerups.clear();
        self.particles.clear();
    }
}
