//! Brick grid loading
//!
//! A level is a grid of brick hit points, one text file per level named
//! `map.<N>`. Each line is a row of digits (`0` = no brick). Other characters
//! are skipped and rows without digits are dropped.

use std::io;
use std::path::Path;

/// Rows of brick hit points
pub type Grid = Vec<Vec<u8>>;

/// Source of level grids
pub trait LevelProvider {
    /// Grid for `index`, or `None` past the last level
    fn get_level(&self, index: usize) -> Option<Grid>;

    fn level_count(&self) -> usize;
}

/// Parse the text of one map file
pub fn parse_grid(text: &str) -> Grid {
    text.lines()
        .map(|line| {
            line.chars()
                .filter_map(|c| c.to_digit(10))
                .map(|d| d as u8)
                .collect::<Vec<u8>>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// Map number of a `map.<N>` file name
fn map_number(file_name: &str) -> Option<u32> {
    file_name.strip_prefix("map.")?.parse().ok()
}

/// Level grids held in memory, ordered by map number
#[derive(Debug, Clone, Default)]
pub struct MapLoader {
    levels: Vec<Grid>,
}

impl MapLoader {
    pub fn from_grids(levels: Vec<Grid>) -> Self {
        Self { levels }
    }

    /// Load every `map.<N>` file in `dir`. Unreadable files are skipped.
    pub fn load_dir(dir: &Path) -> io::Result<Self> {
        let mut numbered = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(number) = name.to_str().and_then(map_number) else {
                continue;
            };
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => numbered.push((number, parse_grid(&text))),
                Err(e) => log::warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
        numbered.sort_by_key(|(number, _)| *number);

        log::info!("Loaded {} levels from {}", numbered.len(), dir.display());
        Ok(Self::from_grids(
            numbered.into_iter().map(|(_, grid)| grid).collect(),
        ))
    }
}

impl LevelProvider for MapLoader {
    fn get_level(&self, index: usize) -> Option<Grid> {
        self.levels.get(index).cloned()
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }
}
