//! Level progress persistence
//!
//! The save file is plain text holding one non-negative integer, the highest
//! unlocked level index. A missing or malformed file reads as 0.

use std::path::{Path, PathBuf};

/// Where the highest unlocked level is kept
pub trait ProgressStore {
    /// Saved level index, 0 when nothing usable is stored
    fn load_progress(&self) -> usize;

    fn save_progress(&mut self, level: usize);

    /// Whether any progress was saved ("continue" is offered only then)
    fn has_progress(&self) -> bool;
}

/// Plain-text save file on disk
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for SaveFile {
    fn load_progress(&self) -> usize {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Could not read save {}: {}", self.path.display(), e);
                return 0;
            }
        };
        match text.trim().parse() {
            Ok(level) => level,
            Err(e) => {
                log::warn!("Bad save file {}: {}", self.path.display(), e);
                0
            }
        }
    }

    fn save_progress(&mut self, level: usize) {
        match std::fs::write(&self.path, level.to_string()) {
            Ok(()) => log::info!("Saved progress: level {}", level),
            Err(e) => log::warn!("Could not write save {}: {}", self.path.display(), e),
        }
    }

    fn has_progress(&self) -> bool {
        self.path.exists()
    }
}

/// In-memory progress store
#[derive(Debug, Clone, Default)]
pub struct MemoryProgress {
    pub saved: Option<usize>,
    /// Number of save calls
    pub writes: usize,
}

impl MemoryProgress {
    pub fn with_level(level: usize) -> Self {
        Self {
            saved: Some(level),
            writes: 0,
        }
    }
}

impl ProgressStore for MemoryProgress {
    fn load_progress(&self) -> usize {
        self.saved.unwrap_or(0)
    }

    fn save_progress(&mut self, level: usize) {
        self.saved = Some(level);
        self.writes += 1;
    }

    fn has_progress(&self) -> bool {
        self.saved.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_save(name: &str) -> SaveFile {
        SaveFile::new(std::env::temp_dir().join(format!(
            "box-breaker-{}-{}.dat",
            name,
            std::process::id()
        )))
    }

    #[test]
    fn test_save_and_load() {
        let mut save = temp_save("roundtrip");
        save.save_progress(4);
        assert!(save.has_progress());
        assert_eq!(save.load_progress(), 4);
        let _ = std::fs::remove_file(save.path());
    }

    #[test]
    fn test_missing_or_malformed_reads_zero() {
        let save = temp_save("missing");
        assert!(!save.has_progress());
        assert_eq!(save.load_progress(), 0);

        let bad = temp_save("malformed");
        std::fs::write(bad.path(), "level three").unwrap();
        assert_eq!(bad.load_progress(), 0);
        std::fs::write(bad.path(), "-2").unwrap();
        assert_eq!(bad.load_progress(), 0);
        let _ = std::fs::remove_file(bad.path());
    }

    #[test]
    fn test_memory_progress() {
        let mut store = MemoryProgress::default();
        assert!(!store.has_progress());
        assert_eq!(store.load_progress(), 0);
        store.save_progress(2);
        assert_eq!(store.load_progress(), 2);
        assert_eq!(store.writes, 1);
    }
}
