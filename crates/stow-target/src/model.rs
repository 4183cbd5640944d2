//! Archived model targets.
//!
//! A model is saved by a caller-supplied function into a scratch directory,
//! next to a `loader.json` naming how to read it back. The directory is then
//! sealed into one zstd-compressed tar file at the target path. Loading
//! reverses the steps and looks the loader up by name in a
//! [`LoaderRegistry`]; no code is ever persisted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stow_codec::{Artifact, ChunkedTableSerializer, JsonObjectProcessor, Table};
use stow_store::{BackendHandle, Encoding, LocalHandle, RemoteHandle, ResolvedHandle};
use tracing::{debug, info};

use crate::archive::{self, ScratchDir};
use crate::error::{TargetError, TargetResult};
use crate::single_file::SingleFileTarget;
use crate::target::TargetVariant;

/// File inside the archive holding the model's native output.
pub const MODEL_FILE: &str = "model.bin";

/// File inside the archive naming the loader.
pub const LOADER_FILE: &str = "loader.json";

/// Loader key of chunked table archives.
pub const CHUNKED_TABLE_LOADER: &str = "stow.chunked-table";

/// Writes a model to the given path in its native representation.
pub type SaveFn<M> = Arc<dyn Fn(&M, &Path) -> anyhow::Result<()> + Send + Sync>;

/// Reads a model back from the path its save function wrote.
pub type LoadFn<M> = Arc<dyn Fn(&Path) -> anyhow::Result<M> + Send + Sync>;

/// Named load strategies.
pub struct LoaderRegistry<M> {
    loaders: BTreeMap<String, LoadFn<M>>,
}

impl<M> LoaderRegistry<M> {
    pub fn new() -> Self {
        Self {
            loaders: BTreeMap::new(),
        }
    }

    /// Register `load` under `key`, replacing any previous loader.
    pub fn register<F>(&mut self, key: impl Into<String>, load: F)
    where
        F: Fn(&Path) -> anyhow::Result<M> + Send + Sync + 'static,
    {
        self.loaders.insert(key.into(), Arc::new(load));
    }

    /// Builder-style [`LoaderRegistry::register`].
    pub fn with_loader<F>(mut self, key: impl Into<String>, load: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<M> + Send + Sync + 'static,
    {
        self.register(key, load);
        self
    }

    pub fn get(&self, key: &str) -> TargetResult<LoadFn<M>> {
        self.loaders
            .get(key)
            .cloned()
            .ok_or_else(|| TargetError::Configuration(format!("no loader registered as {key:?}")))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }
}

impl<M> Default for LoaderRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for LoaderRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            loaders: self.loaders.clone(),
        }
    }
}

/// How a model is saved and read back.
///
/// `save` and `loader_key` are needed to dump. To load, `loader_key` may be
/// left unset; the key persisted in the archive is used instead.
pub struct ModelCodec<M> {
    save: Option<SaveFn<M>>,
    loader_key: Option<String>,
    loaders: LoaderRegistry<M>,
}

impl<M> ModelCodec<M> {
    pub fn new(loaders: LoaderRegistry<M>) -> Self {
        Self {
            save: None,
            loader_key: None,
            loaders,
        }
    }

    pub fn with_save<F>(mut self, save: F) -> Self
    where
        F: Fn(&M, &Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.save = Some(Arc::new(save));
        self
    }

    pub fn with_loader_key(mut self, key: impl Into<String>) -> Self {
        self.loader_key = Some(key.into());
        self
    }

    pub fn loader_key(&self) -> Option<&str> {
        self.loader_key.as_deref()
    }

    pub fn loaders(&self) -> &LoaderRegistry<M> {
        &self.loaders
    }
}

impl ModelCodec<Table> {
    /// Tables split into fragments of at most `max_bytes` estimated size.
    pub fn chunked_table(max_bytes: u64) -> TargetResult<Self> {
        let serializer = ChunkedTableSerializer::new(max_bytes)?;
        let loaders = LoaderRegistry::new().with_loader(CHUNKED_TABLE_LOADER, |path: &Path| {
            Ok(ChunkedTableSerializer::load(path)?)
        });
        Ok(Self::new(loaders)
            .with_save(move |table: &Table, path: &Path| {
                serializer.save(table, path)?;
                Ok(())
            })
            .with_loader_key(CHUNKED_TABLE_LOADER))
    }
}

impl<M> Clone for ModelCodec<M> {
    fn clone(&self) -> Self {
        Self {
            save: self.save.clone(),
            loader_key: self.loader_key.clone(),
            loaders: self.loaders.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LoaderReference {
    loader: String,
}

/// A model archived at one path.
///
/// Holds no lock of its own; [`crate::Target`] serializes access.
pub struct ModelTarget<M> {
    archive: ResolvedHandle,
    scratch: PathBuf,
    codec: ModelCodec<M>,
}

impl<M> ModelTarget<M> {
    pub fn new(archive: ResolvedHandle, scratch: impl Into<PathBuf>, codec: ModelCodec<M>) -> Self {
        Self {
            archive,
            scratch: scratch.into(),
            codec,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    fn loader_file(scratch: &ScratchDir) -> SingleFileTarget {
        let path = scratch.join(LOADER_FILE);
        let handle = LocalHandle::new(path.to_string_lossy(), Encoding::Text);
        SingleFileTarget::new(ResolvedHandle::Local(handle), Arc::new(JsonObjectProcessor))
    }

    fn persisted_loader_key(scratch: &ScratchDir) -> TargetResult<String> {
        let artifact = Self::loader_file(scratch).load()?;
        let value = artifact.into_object().ok_or_else(|| {
            TargetError::Configuration(format!("{LOADER_FILE} does not hold an object"))
        })?;
        let reference: LoaderReference = serde_json::from_value(value)
            .map_err(|e| TargetError::Configuration(format!("malformed {LOADER_FILE}: {e}")))?;
        Ok(reference.loader)
    }
}

impl<M> TargetVariant<M> for ModelTarget<M> {
    fn exists(&self) -> TargetResult<bool> {
        Ok(self.archive.exists()?)
    }

    fn load(&self) -> TargetResult<M> {
        let scratch = ScratchDir::prepare(&self.scratch)?;
        let reader = self.archive.open_read()?;
        archive::unpack(reader, scratch.path())?;

        let key = match self.codec.loader_key() {
            Some(key) => key.to_string(),
            None => Self::persisted_loader_key(&scratch)?,
        };
        let load = self.codec.loaders.get(&key)?;
        debug!(path = self.archive.path(), loader = %key, "loading model");
        load(&scratch.join(MODEL_FILE)).map_err(TargetError::from_model)
    }

    fn dump(&self, value: &M) -> TargetResult<()> {
        let save = self.codec.save.as_ref().ok_or_else(|| {
            TargetError::Configuration(format!("no save function for {}", self.archive.path()))
        })?;
        let key = self.codec.loader_key().ok_or_else(|| {
            TargetError::Configuration(format!("no loader key for {}", self.archive.path()))
        })?;
        self.codec.loaders.get(key)?;

        let scratch = ScratchDir::prepare(&self.scratch)?;
        save(value, &scratch.join(MODEL_FILE)).map_err(TargetError::from_model)?;
        let reference = serde_json::to_value(LoaderReference {
            loader: key.to_string(),
        })
        .map_err(|e| TargetError::Codec(e.into()))?;
        Self::loader_file(&scratch).dump(&Artifact::Object(reference))?;

        let writer = archive::pack(scratch.path(), self.archive.open_write()?)?;
        writer.commit()?;
        info!(path = self.archive.path(), loader = %key, "model archived");
        Ok(())
    }

    fn remove(&self) -> TargetResult<()> {
        Ok(self.archive.remove()?)
    }

    fn path(&self) -> &str {
        self.archive.path()
    }

    fn last_modification_time(&self) -> TargetResult<DateTime<Utc>> {
        Ok(self.archive.last_modified()?)
    }

    fn remote_handle(&self) -> Option<&RemoteHandle> {
        self.archive.as_remote()
    }
}

impl<M> std::fmt::Debug for ModelTarget<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelTarget")
            .field("path", &self.archive.path())
            .field("scratch", &self.scratch)
            .field("loader_key", &self.codec.loader_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stow_codec::Cell;

    /// A toy model stored as little-endian weights.
    #[derive(Debug, PartialEq)]
    struct Weights(Vec<u32>);

    const WEIGHTS_LOADER: &str = "weights.v1";

    fn weights_codec() -> ModelCodec<Weights> {
        let loaders = LoaderRegistry::new().with_loader(WEIGHTS_LOADER, |path: &Path| {
            let bytes = fs::read(path)?;
            Ok(Weights(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ))
        });
        ModelCodec::new(loaders)
            .with_save(|model: &Weights, path: &Path| {
                let bytes: Vec<u8> = model.0.iter().flat_map(|w| w.to_le_bytes()).collect();
                fs::write(path, bytes)?;
                Ok(())
            })
            .with_loader_key(WEIGHTS_LOADER)
    }

    fn local_target<M>(root: &Path, codec: ModelCodec<M>) -> ModelTarget<M> {
        let archive = LocalHandle::new(root.join("out/model.zst").to_string_lossy(), Encoding::Binary);
        ModelTarget::new(ResolvedHandle::Local(archive), root.join("scratch/abc"), codec)
    }

    #[test]
    fn model_roundtrip_cleans_scratch() {
        let root = tempfile::tempdir().unwrap();
        let target = local_target(root.path(), weights_codec());
        let model = Weights(vec![1, 2, 3, 99]);

        target.dump(&model).unwrap();
        assert!(target.exists().unwrap());
        assert!(!target.scratch_dir().exists());

        assert_eq!(target.load().unwrap(), model);
        assert!(!target.scratch_dir().exists());
    }

    #[test]
    fn persisted_loader_key_used_when_unset() {
        let root = tempfile::tempdir().unwrap();
        local_target(root.path(), weights_codec()).dump(&Weights(vec![7])).unwrap();

        let loaders = weights_codec().loaders().clone();
        let reader = local_target(root.path(), ModelCodec::new(loaders));
        assert_eq!(reader.load().unwrap(), Weights(vec![7]));
    }

    #[test]
    fn unknown_persisted_loader_is_configuration_error() {
        let root = tempfile::tempdir().unwrap();
        local_target(root.path(), weights_codec()).dump(&Weights(vec![7])).unwrap();

        let reader = local_target(root.path(), ModelCodec::<Weights>::new(LoaderRegistry::new()));
        assert!(reader.load().unwrap_err().is_configuration());
        assert!(!reader.scratch_dir().exists());
    }

    #[test]
    fn dump_without_save_function_fails_before_writing() {
        let root = tempfile::tempdir().unwrap();
        let codec = ModelCodec::new(weights_codec().loaders().clone()).with_loader_key(WEIGHTS_LOADER);
        let target = local_target(root.path(), codec);
        assert!(target.dump(&Weights(vec![1])).unwrap_err().is_configuration());
        assert!(!target.exists().unwrap());
    }

    #[test]
    fn failing_save_leaves_no_archive_or_scratch() {
        let root = tempfile::tempdir().unwrap();
        let codec = weights_codec().with_save(|_: &Weights, _: &Path| anyhow::bail!("disk full"));
        let target = local_target(root.path(), codec);

        let err = target.dump(&Weights(vec![1])).unwrap_err();
        assert!(matches!(err, TargetError::Model(_)));
        assert!(!target.exists().unwrap());
        assert!(!target.scratch_dir().exists());
    }

    #[test]
    fn stale_scratch_content_is_not_archived() {
        let root = tempfile::tempdir().unwrap();
        let target = local_target(root.path(), weights_codec());
        fs::create_dir_all(target.scratch_dir()).unwrap();
        fs::write(target.scratch_dir().join("leftover"), b"junk").unwrap();

        target.dump(&Weights(vec![5])).unwrap();
        let unpacked = tempfile::tempdir().unwrap();
        let file = fs::File::open(root.path().join("out/model.zst")).unwrap();
        archive::unpack(file, unpacked.path()).unwrap();
        assert!(unpacked.path().join(MODEL_FILE).is_file());
        assert!(unpacked.path().join(LOADER_FILE).is_file());
        assert!(!unpacked.path().join("leftover").exists());
    }

    #[test]
    fn chunked_table_archive_roundtrip() {
        let root = tempfile::tempdir().unwrap();
        let table = Table::from_rows(
            ["id", "name"],
            (0..40).map(|i| vec![Cell::Int(i), Cell::from(format!("row-{i}"))]).collect(),
        )
        .unwrap();
        let target = local_target(root.path(), ModelCodec::chunked_table(100).unwrap());

        target.dump(&table).unwrap();
        assert_eq!(target.load().unwrap(), table);
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(ModelCodec::chunked_table(0).err().unwrap().is_configuration());
    }
}
