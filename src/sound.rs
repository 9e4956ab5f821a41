use std::{fmt, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// shared, read only view of uploaded audio bytes
pub type SoundData = Arc<[u8]>;

/// the uploaded audio itself, only valid while the app is running.
///
/// Handles are never persisted. Dropping or releasing the handle gives up the
/// registry's reference to the buffer; playback that is already running keeps
/// its own reference until it is stopped.
pub struct SoundHandle {
    data: SoundData,
}

impl SoundHandle {
    #[must_use]
    pub fn new(bytes: impl Into<SoundData>) -> Self {
        Self { data: bytes.into() }
    }

    /// reads an audio file picked by the user, returning its file name as
    /// the display name
    pub fn from_file(path: &Path) -> Result<(String, Self)> {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
        Ok((name, Self::new(bytes)))
    }

    #[must_use]
    pub fn data(&self) -> SoundData {
        Arc::clone(&self.data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn release(self) {
        log::debug!("releasing {} bytes of sound data", self.len());
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("len", &self.len())
            .finish()
    }
}

/// the part of a sound that survives a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundMeta {
    pub id: SoundId,
    pub name: String,
}

#[derive(Debug)]
pub struct SoundAsset {
    pub id: SoundId,
    pub name: String,
    handle: Option<SoundHandle>,
}

impl SoundAsset {
    /// `None` for sounds restored from storage, their audio was not kept
    #[must_use]
    pub const fn handle(&self) -> Option<&SoundHandle> {
        self.handle.as_ref()
    }

    #[must_use]
    pub const fn is_playable(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn meta(&self) -> SoundMeta {
        SoundMeta {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for SoundAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_playable() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} (reupload to play)", self.name)
        }
    }
}

/// owns every uploaded sound, alarms only refer to them by id
#[derive(Debug, Default)]
pub struct SoundRegistry {
    assets: Vec<SoundAsset>,
    next_id: u64,
}

impl SoundRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// rebuilds the registry from persisted metadata, restored sounds have no
    /// audio attached
    #[must_use]
    pub fn from_metadata(metadata: Vec<SoundMeta>) -> Self {
        let mut registry = Self::new();
        for meta in metadata {
            if registry.resolve(meta.id).is_some() {
                log::warn!("skipping duplicate sound id {}", meta.id);
                continue;
            }
            registry.next_id = registry.next_id.max(meta.id.0.saturating_add(1));
            registry.assets.push(SoundAsset {
                id: meta.id,
                name: meta.name,
                handle: None,
            });
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handle: SoundHandle) -> SoundId {
        let assets = &self.assets;
        let id = SoundId(store::allocate_id(&mut self.next_id, |id| {
            assets.iter().any(|asset| asset.id.0 == id)
        }));
        let name = name.into();
        log::info!("registered sound {id} `{name}` ({} bytes)", handle.len());
        self.assets.push(SoundAsset {
            id,
            name,
            handle: Some(handle),
        });
        id
    }

    /// removes the sound and releases its audio
    pub fn remove(&mut self, id: SoundId) -> Option<SoundMeta> {
        let index = self.assets.iter().position(|asset| asset.id == id)?;
        let asset = self.assets.remove(index);
        let meta = asset.meta();
        if let Some(handle) = asset.handle {
            handle.release();
        }
        log::info!("removed sound {id} `{}`", meta.name);
        Some(meta)
    }

    #[must_use]
    pub fn resolve(&self, id: SoundId) -> Option<&SoundAsset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: SoundId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundAsset> {
        self.assets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    #[must_use]
    pub fn metadata(&self) -> Vec<SoundMeta> {
        self.assets.iter().map(SoundAsset::meta).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn register_hands_out_fresh_ids() {
        let mut registry = SoundRegistry::new();
        let first = registry.register("a.mp3", SoundHandle::new(vec![1_u8, 2, 3]));
        let second = registry.register("b.mp3", SoundHandle::new(vec![4_u8]));
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
        let asset = registry.resolve(first).unwrap();
        assert_eq!(asset.name, "a.mp3");
        assert_eq!(asset.handle().unwrap().len(), 3);
    }

    #[test]
    fn ids_stay_unique_after_removal() {
        let mut registry = SoundRegistry::new();
        let first = registry.register("a.mp3", SoundHandle::new(vec![1_u8]));
        registry.remove(first);
        let second = registry.register("b.mp3", SoundHandle::new(vec![2_u8]));
        assert_ne!(first, second);
    }

    #[test]
    fn remove_releases_the_audio() {
        let mut registry = SoundRegistry::new();
        let handle = SoundHandle::new(vec![0_u8; 16]);
        let weak = Arc::downgrade(&handle.data());
        let id = registry.register("beep.wav", handle);
        assert!(weak.upgrade().is_some());

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.name, "beep.wav");
        assert!(weak.upgrade().is_none());
        assert!(registry.resolve(id).is_none());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn metadata_restores_without_audio() {
        let mut registry = SoundRegistry::new();
        registry.register("a.mp3", SoundHandle::new(vec![1_u8]));
        registry.register("b.mp3", SoundHandle::new(vec![2_u8]));
        let metadata = registry.metadata();

        let mut restored = SoundRegistry::from_metadata(metadata.clone());
        assert_eq!(restored.metadata(), metadata);
        assert!(restored.iter().all(|asset| !asset.is_playable()));

        let id = restored.register("c.mp3", SoundHandle::new(vec![3_u8]));
        assert!(metadata.iter().all(|meta| meta.id != id));
    }

    #[test]
    fn from_metadata_skips_duplicates() {
        let meta = SoundMeta {
            id: SoundId(3),
            name: "a.mp3".to_string(),
        };
        let registry = SoundRegistry::from_metadata(vec![meta.clone(), meta]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ids_wrap_to_a_free_slot_past_the_storable_range() {
        let mut registry = SoundRegistry::from_metadata(vec![SoundMeta {
            id: SoundId(store::MAX_ID),
            name: "last.mp3".to_string(),
        }]);
        let id = registry.register("next.mp3", SoundHandle::new(vec![1_u8]));
        assert_eq!(id, SoundId(0));
        let id = registry.register("after.mp3", SoundHandle::new(vec![2_u8]));
        assert_eq!(id, SoundId(1));
    }

    #[test]
    fn reads_uploaded_file() {
        let mut file = tempfile::Builder::new().suffix(".ogg").tempfile().unwrap();
        file.write_all(b"not really ogg").unwrap();
        let (name, handle) = SoundHandle::from_file(file.path()).unwrap();
        assert!(name.ends_with(".ogg"));
        assert_eq!(handle.len(), 14);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SoundHandle::from_file(&dir.path().join("gone.mp3"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
