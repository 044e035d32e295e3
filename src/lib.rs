//! Box Breaker - a paddle, a ball and a wall of bricks on a rigid-body world
//!
//! Core modules:
//! - `sim`: Fixed-timestep simulation (physics adapter, contacts, entities, game modes)
//! - `assets`: Image/sound lookup by name
//! - `levels`: Brick grid loading
//! - `persistence`: Level progress save file
//! - `settings`: Paths and data-driven game balance

pub mod assets;
pub mod levels;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use assets::{AssetProvider, AssetTable, Image, SoundClip};
pub use levels::{Grid, LevelProvider, MapLoader};
pub use persistence::{MemoryProgress, ProgressStore, SaveFile};
pub use settings::{Settings, Tuning};

/// Game configuration constants
pub mod consts {
    /// Play field size in pixels
    pub const SCREEN_WIDTH: f32 = 640.0;
    pub const SCREEN_HEIGHT: f32 = 480.0;

    /// Simulation rate; the world is always stepped by exactly `SIM_DT`
    pub const FPS: u32 = 60;
    pub const SIM_DT: f32 = 1.0 / FPS as f32;
    /// Maximum substeps per rendered frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Pixels per physics world unit
    pub const PPM: f32 = 20.0;
    /// Gravity in world units/s² (y points down)
    pub const GRAVITY_Y: f32 = 8.0;
    pub const VELOCITY_ITERATIONS: usize = 6;
    pub const POSITION_ITERATIONS: usize = 2;

    /// Brick grid layout (pixels)
    pub const BRICK_GAP: f32 = 2.0;
    pub const BRICK_TOP_OFFSET: f32 = 36.0;

    /// Distance between the paddle's bottom edge and the bottom of the field
    pub const PADDLE_BOTTOM_MARGIN: f32 = 10.0;
    /// Bottom edge width of the paddle trapezoid relative to its top edge
    pub const PADDLE_TAPER: f32 = 0.8;

    /// Particle behaviour (per frame, pixels)
    pub const PARTICLE_GRAVITY: f32 = 0.1;
    pub const PARTICLE_LIFE_FRAMES: u32 = FPS * 2;
}

/// Convert a pixel distance to physics world units
#[inline]
pub fn to_world(pixels: f32) -> f32 {
    pixels / consts::PPM
}

/// Convert a physics world distance to pixels
#[inline]
pub fn to_pixels(world: f32) -> f32 {
    world * consts::PPM
}
