//! Game settings and balance values
//!
//! Loaded from an optional JSON file. Every field has a default, so a partial
//! file only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Gameplay balance values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Ball speed limits (world units/s)
    pub min_ball_speed: f32,
    pub max_ball_speed: f32,
    /// Horizontal launch impulse is drawn from `[-x, x]`
    pub launch_impulse_x: f32,
    pub launch_impulse_y: f32,
    pub starting_lives: i32,
    /// Bullet speed (world units/s, upward)
    pub bullet_speed: f32,
    pub brick_score: u64,
    pub gold_bonus: u64,
    pub shot_ammo: u32,
    pub multi_ball_count: u32,
    pub grow_factor: f32,
    pub particles_per_brick: u32,
    /// Chance (0..1) that a broken brick drops a power-up
    pub powerup_drop_chance: f32,
    /// Pixels per frame
    pub powerup_fall_speed: f32,
    /// Total growth (pixels) of a brick's bounds for a bomb blast
    pub explosion_margin: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            min_ball_speed: 13.0,
            max_ball_speed: 20.0,
            launch_impulse_x: 7.0,
            launch_impulse_y: -15.0,
            starting_lives: 5,
            bullet_speed: 20.0,
            brick_score: 100,
            gold_bonus: 500,
            shot_ammo: 20,
            multi_ball_count: 4,
            grow_factor: 1.5,
            particles_per_brick: 5,
            powerup_drop_chance: 0.2,
            powerup_fall_speed: 2.0,
            explosion_margin: 50.0,
        }
    }
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding `map.<N>` files
    pub map_dir: PathBuf,
    /// Plain-text save file (highest unlocked level)
    pub save_path: PathBuf,
    /// Session RNG seed
    pub seed: u64,
    /// Frames the headless runner simulates before stopping
    pub max_frames: u32,
    /// Start from the saved level instead of level 0
    pub continue_game: bool,
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_dir: PathBuf::from("data"),
            save_path: PathBuf::from("save.dat"),
            seed: 0x5eed,
            max_frames: 60 * 120,
            continue_game: false,
            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not read settings {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Bad settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            Settings::from_json(r#"{ "seed": 7, "tuning": { "shot_ammo": 3 } }"#).unwrap();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.tuning.shot_ammo, 3);
        assert_eq!(settings.tuning.gold_bonus, 500);
        assert_eq!(settings.map_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_bad_file_falls_back() {
        let missing = std::env::temp_dir().join("box-breaker-no-such-settings.json");
        assert_eq!(Settings::load(&missing), Settings::default());

        let bad = std::env::temp_dir().join(format!("box-breaker-bad-{}.json", std::process::id()));
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(Settings::load(&bad), Settings::default());
        let _ = std::fs::remove_file(bad);
    }

    #[test]
    fn test_roundtrip() {
        let mut settings = Settings::default();
        settings.tuning.grow_factor = 2.0;
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
