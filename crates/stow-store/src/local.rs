use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BackendHandle, Encoding, StagedWrite};

/// A file on the local filesystem.
///
/// Writes go to a temp file next to the destination and are renamed into
/// place on commit, so readers see either the old file or the new one.
#[derive(Clone, Debug)]
pub struct LocalHandle {
    path: String,
    fs_path: PathBuf,
    encoding: Encoding,
}

impl LocalHandle {
    pub fn new(path: impl Into<String>, encoding: Encoding) -> Self {
        let path = path.into();
        let fs_path = PathBuf::from(&path);
        Self {
            path,
            fs_path,
            encoding,
        }
    }

    /// The path as a filesystem path.
    pub fn fs_path(&self) -> &Path {
        &self.fs_path
    }

    fn not_found_or(&self, err: io::Error) -> StoreError {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(self.path.clone())
        } else {
            StoreError::Io(err)
        }
    }

    fn parent_dir(&self) -> PathBuf {
        match self.fs_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl BackendHandle for LocalHandle {
    fn path(&self) -> &str {
        &self.path
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn exists(&self) -> StoreResult<bool> {
        Ok(self.fs_path.is_file())
    }

    fn open_read(&self) -> StoreResult<Box<dyn Read + Send>> {
        let file = File::open(&self.fs_path).map_err(|e| self.not_found_or(e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self) -> StoreResult<Box<dyn StagedWrite>> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;
        let temp = NamedTempFile::new_in(&dir)?;
        Ok(Box::new(LocalStagedWrite {
            writer: BufWriter::new(temp),
            destination: self.fs_path.clone(),
        }))
    }

    fn remove(&self) -> StoreResult<()> {
        fs::remove_file(&self.fs_path).map_err(|e| self.not_found_or(e))
    }

    fn last_modified(&self) -> StoreResult<DateTime<Utc>> {
        let meta = fs::metadata(&self.fs_path).map_err(|e| self.not_found_or(e))?;
        Ok(DateTime::<Utc>::from(meta.modified()?))
    }
}

/// Temp file that is renamed over the destination on commit.
struct LocalStagedWrite {
    writer: BufWriter<NamedTempFile>,
    destination: PathBuf,
}

impl Write for LocalStagedWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl StagedWrite for LocalStagedWrite {
    fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self {
            writer,
            destination,
        } = *self;
        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&destination).map_err(|e| e.error)?;
        tracing::debug!(path = %destination.display(), "committed local artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_in(dir: &Path, name: &str) -> LocalHandle {
        LocalHandle::new(dir.join(name).to_string_lossy().into_owned(), Encoding::Binary)
    }

    fn write_all(handle: &LocalHandle, data: &[u8]) {
        let mut w = handle.open_write().unwrap();
        w.write_all(data).unwrap();
        w.commit().unwrap();
    }

    #[test]
    fn write_commit_read() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "nested/out.bin");
        assert!(!handle.exists().unwrap());

        write_all(&handle, b"payload");
        assert!(handle.exists().unwrap());

        let mut buf = Vec::new();
        handle.open_read().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn uncommitted_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "out.bin");
        {
            let mut w = handle.open_write().unwrap();
            w.write_all(b"partial").unwrap();
        }
        assert!(!handle.exists().unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn uncommitted_write_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "out.bin");
        write_all(&handle, b"v1");
        {
            let mut w = handle.open_write().unwrap();
            w.write_all(b"v2-partial").unwrap();
        }
        assert_eq!(fs::read(handle.fs_path()).unwrap(), b"v1");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "missing.bin");
        assert!(handle.open_read().err().unwrap().is_not_found());
        assert!(handle.remove().unwrap_err().is_not_found());
        assert!(handle.last_modified().unwrap_err().is_not_found());
    }

    #[test]
    fn remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "out.bin");
        write_all(&handle, b"x");
        handle.remove().unwrap();
        assert!(!handle.exists().unwrap());
    }

    #[test]
    fn last_modified_is_recent() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle_in(dir.path(), "out.bin");
        let before = Utc::now() - chrono::Duration::seconds(5);
        write_all(&handle, b"x");
        assert!(handle.last_modified().unwrap() >= before);
    }
}
