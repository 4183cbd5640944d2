//! Chunked storage for oversized tables.
//!
//! A table is split by row position into `fragment_0`, `fragment_1`, ...
//! files in one directory and concatenated back in numeric order. Each
//! fragment is an independent zstd-compressed bincode table.
//!
//! There is no coordination between writers: concurrent `save` and `load`
//! on one directory must be serialized by the caller.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::artifact::Table;
use crate::error::{CodecError, CodecResult};
use crate::processor::PackedTableProcessor;

/// File-name prefix shared by every fragment.
pub const FRAGMENT_PREFIX: &str = "fragment_";

/// Splits tables across fragment files under a soft size ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkedTableSerializer {
    max_bytes: u64,
}

impl ChunkedTableSerializer {
    /// `max_bytes` is a soft ceiling on each fragment's estimated footprint.
    pub fn new(max_bytes: u64) -> CodecResult<Self> {
        if max_bytes == 0 {
            return Err(CodecError::InvalidChunkSize);
        }
        Ok(Self { max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Number of fragments `save` writes for `table`:
    /// `floor(footprint / max_bytes) + 1`.
    ///
    /// With fewer rows than fragments the trailing fragments hold no rows.
    pub fn chunk_count(&self, table: &Table) -> usize {
        let wanted = table.estimated_bytes() / self.max_bytes + 1;
        usize::try_from(wanted).unwrap_or(usize::MAX)
    }

    /// Write `table` as fragments in the directory containing `model_path`.
    ///
    /// Fragments left by an earlier save in the same directory are removed
    /// first. Returns the number of fragments written.
    pub fn save(&self, table: &Table, model_path: &Path) -> CodecResult<usize> {
        let dir = fragment_dir(model_path);
        fs::create_dir_all(&dir)?;
        for (_, stale) in list_fragments(&dir)? {
            fs::remove_file(stale)?;
        }

        let count = self.chunk_count(table);
        if count > 1 {
            info!(
                rows = table.num_rows(),
                estimated_bytes = table.estimated_bytes(),
                max_bytes = self.max_bytes,
                fragments = count,
                "saving large table in fragments"
            );
        }
        for (idx, range) in partition(table.num_rows(), count).into_iter().enumerate() {
            write_fragment(&fragment_path(&dir, idx), &table.slice(range))?;
        }
        Ok(count)
    }

    /// Read every fragment next to `model_path` and concatenate them.
    pub fn load(model_path: &Path) -> CodecResult<Table> {
        let dir = fragment_dir(model_path);
        let fragments = list_fragments(&dir)?;
        if fragments.is_empty() {
            return Err(CodecError::NoFragments(dir.display().to_string()));
        }
        debug!(dir = %dir.display(), fragments = fragments.len(), "loading table fragments");
        let parts = fragments
            .iter()
            .map(|(_, path)| read_fragment(path))
            .collect::<CodecResult<Vec<_>>>()?;
        Table::concat(parts)
    }
}

/// Split `rows` positions into `count` contiguous ranges whose sizes differ
/// by at most one; the first `rows % count` ranges are the longer ones.
pub fn partition(rows: usize, count: usize) -> Vec<Range<usize>> {
    let count = count.max(1);
    let base = rows / count;
    let extra = rows % count;
    let mut start = 0;
    (0..count)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn fragment_dir(model_path: &Path) -> PathBuf {
    match model_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn fragment_path(dir: &Path, idx: usize) -> PathBuf {
    dir.join(format!("{FRAGMENT_PREFIX}{idx}"))
}

/// Fragment files in `dir`, sorted by their numeric suffix.
fn list_fragments(dir: &Path) -> CodecResult<Vec<(usize, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut fragments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(idx) = name
            .to_str()
            .and_then(|n| n.strip_prefix(FRAGMENT_PREFIX))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        if entry.file_type()?.is_file() {
            fragments.push((idx, entry.path()));
        }
    }
    fragments.sort_by_key(|(idx, _)| *idx);
    Ok(fragments)
}

fn write_fragment(path: &Path, table: &Table) -> CodecResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    PackedTableProcessor::encode(table, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn read_fragment(path: &Path) -> CodecResult<Table> {
    let mut reader = BufReader::new(File::open(path)?);
    PackedTableProcessor::decode(&mut reader)
}
