use std::{
    cell::RefCell,
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

pub const ALARMS_KEY: &str = "alarms";
pub const SOUNDS_KEY: &str = "sounds";
pub const THEME_KEY: &str = "theme";

/// largest id a TOML integer can hold
pub const MAX_ID: u64 = i64::MAX.unsigned_abs();

/// hands out `next` while it still fits in a stored integer, after that the
/// lowest id not `in_use`
pub(crate) fn allocate_id(next: &mut u64, in_use: impl Fn(u64) -> bool) -> u64 {
    if *next <= MAX_ID {
        let id = *next;
        *next += 1;
        return id;
    }
    (0..=MAX_ID).find(|&id| !in_use(id)).unwrap_or(MAX_ID)
}

/// synchronous key value storage for the app state
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// keeps every key in its own `<key>.toml` file inside one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// the store in the user's data directory
    pub fn open_default() -> Result<Self> {
        let dirs =
            directories::ProjectDirs::from("", "", "roosty_alarms").ok_or(Error::NoProjectDirs)?;
        Ok(Self::new(dirs.data_dir().join("store")))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.toml"))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path(key);
        std::fs::write(&path, value).map_err(|e| Error::io(path, e))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(Error::io(path, e)),
            _ => Ok(()),
        }
    }
}

/// in memory store, clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// reads and parses `key`, `None` if nothing was stored
pub fn read<T: DeserializeOwned>(store: &impl Store, key: &str) -> Result<Option<T>> {
    store
        .get(key)?
        .map(|value| {
            toml::from_str(&value).map_err(|source| Error::Parse {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// like [`read`] but any problem yields the default value, so a corrupt or
/// missing entry never stops the app from starting
pub fn read_or_default<T: DeserializeOwned + Default>(store: &impl Store, key: &str) -> T {
    match read(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            log::debug!("nothing stored under `{key}`, using default");
            T::default()
        }
        Err(e) => {
            log::warn!("{e}, using default");
            T::default()
        }
    }
}

pub fn write<T: Serialize>(store: &mut impl Store, key: &str, value: &T) -> Result<()> {
    let value = toml::to_string(value).map_err(|source| Error::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &value)
}
