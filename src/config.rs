use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    store::FileStore,
};

/// user settings from `config.toml`. App state (alarms, sounds, theme) lives
/// in the [`FileStore`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// chrono format used to show times
    pub time_format: String,
    pub poll_interval_ms: u64,
    /// played for alarms that have no sound of their own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sound: Option<PathBuf>,
    /// where alarms and sounds are stored, defaults to the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%l:%M %p".to_string(),
            poll_interval_ms: 1000,
            default_sound: None,
            data_dir: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// a missing file is not an error, it just means defaults
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = match std::fs::read_to_string(&path) {
            Ok(config) => config,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io(path, e)),
        };
        toml::from_str(&config).map_err(|source| Error::Parse {
            key: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: PathBuf) -> Result<()> {
        let config = toml::to_string(self).map_err(|source| Error::Serialize {
            key: path.display().to_string(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&path, config).map_err(|e| Error::io(path, e))
    }

    pub fn config_path() -> Result<PathBuf> {
        let mut path = directories::ProjectDirs::from("", "", "roosty_alarms")
            .ok_or(Error::NoProjectDirs)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn store(&self) -> Result<FileStore> {
        self.data_dir
            .as_ref()
            .map_or_else(FileStore::open_default, |dir| Ok(FileStore::new(dir)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            time_format: "%H:%M".to_string(),
            poll_interval_ms: 250,
            default_sound: Some(PathBuf::from("/tmp/rooster.mp3")),
            data_dir: Some(dir.path().join("data")),
        };
        config.save(path.clone()).unwrap();
        assert_eq!(Config::load(path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = 0\n").unwrap();
        let config = Config::load(path).unwrap();
        assert_eq!(config.time_format, Config::default().time_format);
        // a zero interval would spin
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = \"soon\"\n").unwrap();
        assert!(matches!(Config::load(path), Err(Error::Parse { .. })));
    }

    #[test]
    fn data_dir_overrides_the_store() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/alarms")),
            ..Config::default()
        };
        assert_eq!(
            config.store().unwrap().dir(),
            std::path::Path::new("/tmp/alarms")
        );
    }
}
