use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("couldn't access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't parse `{key}`: {source}")]
    Parse {
        key: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("couldn't serialize `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("couldn't find a home directory for the app data")]
    NoProjectDirs,

    #[error("invalid alarm time `{0}`, expected HH:MM")]
    InvalidTime(String),

    #[error("invalid theme color `{0}`, expected #rrggbb")]
    InvalidColor(String),

    #[error("couldn't spawn the {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
