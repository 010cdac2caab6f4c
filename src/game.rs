// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Game content handed over by the frontend.
//!
//! With `need_fullpath = false` the frontend may pass the file already
//! loaded, a path, or both. The buffer wins when present.

use crate::error::CoreError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct GameSource {
    pub path: Option<PathBuf>,
    pub data: Option<Vec<u8>>,
}

impl GameSource {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            data: None,
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            path: None,
            data: Some(data),
        }
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn read(self) -> Result<LoadedGame, CoreError> {
        let data = match (self.data, &self.path) {
            (Some(d), _) => d,
            (None, Some(p)) => std::fs::read(p).map_err(|source| CoreError::Content {
                path: p.clone(),
                source,
            })?,
            (None, None) => return Err(CoreError::NoContent),
        };
        Ok(LoadedGame {
            path: self.path,
            data,
        })
    }
}

/// Content read into memory, kept for the whole session so `reset` can
/// boot it again.
#[derive(Debug, Clone)]
pub struct LoadedGame {
    pub path: Option<PathBuf>,
    pub data: Vec<u8>,
}

impl LoadedGame {
    /// What scripts see as `arg[1]`
    pub fn name(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => "main.lua".to_string(),
        }
    }

    /// Directory searched for the game's own modules
    pub fn dir(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|d| !d.as_os_str().is_empty())
    }

    /// Lua chunk name, shown in error messages
    pub fn chunk_name(&self) -> String {
        match &self.path {
            Some(p) => format!("@{}", p.display()),
            None => "=main.lua".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_preferred_over_path() {
        let g = GameSource::from_bytes(b"x = 1".to_vec())
            .with_path("/nonexistent/game.lua")
            .read()
            .unwrap();
        assert_eq!(g.data, b"x = 1");
        assert_eq!(g.dir(), Some(Path::new("/nonexistent")));
        assert_eq!(g.chunk_name(), "@/nonexistent/game.lua");
    }

    #[test]
    fn test_read_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("game.lua");
        std::fs::write(&p, "return 1").unwrap();
        let g = GameSource::from_path(&p).read().unwrap();
        assert_eq!(g.data, b"return 1");
        assert_eq!(g.name(), p.display().to_string());
    }

    #[test]
    fn test_missing_content() {
        assert!(matches!(
            GameSource::default().read(),
            Err(CoreError::NoContent)
        ));
        assert!(matches!(
            GameSource::from_path("/nonexistent/game.lua").read(),
            Err(CoreError::Content { .. })
        ));
        let g = GameSource::from_bytes(Vec::new()).read().unwrap();
        assert_eq!(g.dir(), None);
        assert_eq!(g.name(), "main.lua");
    }
}
