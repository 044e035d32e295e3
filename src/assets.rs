//! Image and sound lookup
//!
//! The simulation only needs sprite sizes and a way to trigger sounds. Pixel
//! data and audio playback belong to a frontend that implements
//! [`AssetProvider`]; [`AssetTable`] is the in-memory default.

use std::collections::HashMap;

use glam::Vec2;

/// Size used when an image is missing
pub const FALLBACK_IMAGE: Image = Image {
    width: 16,
    height: 16,
};

/// Image metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundClip {
    pub name: String,
}

/// Source of images and sounds
pub trait AssetProvider {
    /// Never fails; a missing image yields a default-size one
    fn get_image(&self, name: &str) -> Image;

    fn get_sound(&self, name: &str) -> Option<SoundClip>;

    fn play(&mut self, clip: &SoundClip);

    /// Play a sound by name; unknown names are ignored
    fn play_sound(&mut self, name: &str) {
        if let Some(clip) = self.get_sound(name) {
            self.play(&clip);
        }
    }
}

/// In-memory asset table that records played sounds
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    images: HashMap<String, Image>,
    sounds: HashMap<String, SoundClip>,
    played: Vec<String>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sprite sizes and sound cues of the stock game
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert_image("paddle", Image::new(96, 20));
        table.insert_image("ball", Image::new(16, 16));
        table.insert_image("ball_bomb", Image::new(16, 16));
        table.insert_image("bullet", Image::new(6, 14));
        for name in crate::sim::state::BRICK_SPRITES {
            table.insert_image(name, Image::new(48, 20));
        }
        for kind in crate::sim::PowerUpKind::ALL {
            table.insert_image(kind.sprite(), Image::new(32, 16));
        }
        for name in [
            "sfx-01", "sfx-01b", "sfx-02", "sfx-05", "sfx-06", "sfx-08", "sfx-09",
        ] {
            table.insert_sound(name);
        }
        table
    }

    pub fn insert_image(&mut self, name: &str, image: Image) {
        self.images.insert(name.to_string(), image);
    }

    pub fn insert_sound(&mut self, name: &str) {
        self.sounds.insert(
            name.to_string(),
            SoundClip {
                name: name.to_string(),
            },
        );
    }

    /// Names of every sound played so far, in order
    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl AssetProvider for AssetTable {
    fn get_image(&self, name: &str) -> Image {
        match self.images.get(name) {
            Some(image) => *image,
            None => {
                log::warn!("Missing image '{}', using fallback", name);
                FALLBACK_IMAGE
            }
        }
    }

    fn get_sound(&self, name: &str) -> Option<SoundClip> {
        self.sounds.get(name).cloned()
    }

    fn play(&mut self, clip: &SoundClip) {
        log::debug!("Sound {}", clip.name);
        self.played.push(clip.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_image_falls_back() {
        let table = AssetTable::builtin();
        assert_eq!(table.get_image("paddle"), Image::new(96, 20));
        assert_eq!(table.get_image("nope"), FALLBACK_IMAGE);
    }

    #[test]
    fn test_unknown_sound_is_ignored() {
        let mut table = AssetTable::builtin();
        table.play_sound("sfx-02");
        table.play_sound("sfx-99");
        assert_eq!(table.played(), ["sfx-02".to_string()]);
    }

    #[test]
    fn test_builtin_has_every_sprite() {
        let table = AssetTable::builtin();
        for kind in crate::sim::PowerUpKind::ALL {
            assert_ne!(table.get_image(kind.sprite()), FALLBACK_IMAGE);
        }
        assert_eq!(table.get_image("brick_silver").size(), Vec2::new(48.0, 20.0));
    }
}
