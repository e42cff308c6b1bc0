//! File system paths for the admin client.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for client runtime files (~/.prodos)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.prodos`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".prodos"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.prodos).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.prodos/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the profile store file path (~/.prodos/profile.json).
    ///
    /// This holds the per-profile key-value records (session, rate limit)
    /// that the web client keeps in localStorage.
    pub fn profile_file(&self) -> PathBuf {
        self.base_dir.join("profile.json")
    }

    /// Ensure the base directory exists.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_with_base_dir() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/prodos-test"));
        assert_eq!(paths.base_dir(), &PathBuf::from("/tmp/prodos-test"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/prodos-test/config.json")
        );
        assert_eq!(
            paths.profile_file(),
            PathBuf::from("/tmp/prodos-test/profile.json")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_base() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("nested"));
        paths.ensure_dirs().unwrap();
        assert!(paths.base_dir().exists());
    }
}
