//! zstd-compressed tar archives of a scratch directory.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const ARCHIVE_ZSTD_LEVEL: i32 = 3;

/// Pack every file under `dir` into `writer` and return the writer.
///
/// Entries are the files' paths relative to `dir`, in sorted order. No
/// directory entries are written.
pub fn pack<W: Write>(dir: &Path, writer: W) -> io::Result<W> {
    let encoder = zstd::Encoder::new(writer, ARCHIVE_ZSTD_LEVEL)?;
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    for file in files_under(dir)? {
        let name = file.strip_prefix(dir).map_err(io::Error::other)?;
        builder.append_path_with_name(&file, name)?;
    }
    let encoder = builder.into_inner()?;
    encoder.finish()
}

fn files_under(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    let mut files = Vec::new();
    for path in entries {
        if fs::symlink_metadata(&path)?.is_dir() {
            files.extend(files_under(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

/// Unpack an archive produced by [`pack`] into `dir`.
pub fn unpack<R: Read>(reader: R, dir: &Path) -> io::Result<()> {
    let decoder = zstd::Decoder::new(reader)?;
    tar::Archive::new(decoder).unpack(dir)
}

/// A scratch directory that is emptied on creation and deleted on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Clear out `path` and create it fresh.
    pub fn prepare(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "cleared stale scratch directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
            }
        }
    }
}
