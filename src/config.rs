use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{KmError, Result};

/// Overrides the base directory, mostly for tests and portable installs.
pub const HOME_ENV: &str = "KINDLEMATE_HOME";

pub struct AppPaths {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Ok(Self::from_base(PathBuf::from(home)));
        }
        let base = dirs::home_dir()
            .ok_or_else(|| KmError::Config("could not determine home directory".into()))?
            .join(".kindlemate");
        Ok(Self::from_base(base))
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            db_path: base.join("KM2.dat"),
            config_path: base.join("config.toml"),
            base_dir: base,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSection,
}

/// Where the e-reader is mounted and where its two sources live under that mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_clippings_path")]
    pub clippings_path: PathBuf,
    #[serde(default = "default_vocab_path")]
    pub vocab_path: PathBuf,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            root: None,
            clippings_path: default_clippings_path(),
            vocab_path: default_vocab_path(),
        }
    }
}

fn default_clippings_path() -> PathBuf {
    PathBuf::from("documents").join("My Clippings.txt")
}

fn default_vocab_path() -> PathBuf {
    PathBuf::from("system").join("vocabulary").join("vocab.db")
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| KmError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn device_clippings(&self, root: &Path) -> PathBuf {
        root.join(&self.device.clippings_path)
    }

    pub fn device_vocab(&self, root: &Path) -> PathBuf {
        root.join(&self.device.vocab_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_base() {
        let paths = AppPaths::from_base(PathBuf::from("/tmp/test-km"));
        assert_eq!(paths.base_dir, PathBuf::from("/tmp/test-km"));
        assert_eq!(paths.db_path, PathBuf::from("/tmp/test-km/KM2.dat"));
        assert_eq!(paths.config_path, PathBuf::from("/tmp/test-km/config.toml"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert!(config.device.root.is_none());
        assert_eq!(
            config.device_clippings(Path::new("/media/kindle")),
            PathBuf::from("/media/kindle/documents/My Clippings.txt")
        );
        assert_eq!(
            config.device_vocab(Path::new("/media/kindle")),
            PathBuf::from("/media/kindle/system/vocabulary/vocab.db")
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device]\nroot = \"/Volumes/Kindle\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.device.root, Some(PathBuf::from("/Volumes/Kindle")));
        assert_eq!(config.device.clippings_path, default_clippings_path());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device\nroot = ").unwrap();
        assert!(matches!(Config::load(&path), Err(KmError::Config(_))));
    }
}
