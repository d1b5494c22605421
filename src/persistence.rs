//! Persisted forms of the lexical index.
//!
//! Two formats:
//!
//! - JSON: an object mapping each token to its sorted identifier array.
//!   Human-readable and stable across versions.
//! - Snapshot (feature `snapshot`): a magic header and a format version,
//!   then the same token map encoded with `bincode`.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never sees a half-written file. The spatial index is not persisted;
//! it is rebuilt from the record store.

use crate::compute::lexical::InvertedIndex;
use crate::error::Result;
#[cfg(feature = "snapshot")]
use crate::error::CityQueryError;
use cityquery_types::record::RecordId;
use rustc_hash::FxHashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "snapshot")]
const SNAPSHOT_MAGIC: &[u8] = b"CITYQUERY_LEXICON";
#[cfg(feature = "snapshot")]
const SNAPSHOT_VERSION: u8 = 1;

type Postings = FxHashMap<String, Vec<RecordId>>;

/// Write `index` as a JSON object, tokens in sorted order.
pub fn write_json<W: Write>(index: &InvertedIndex, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &index.to_sorted_map())?;
    Ok(())
}

/// Read an index written by [`write_json`].
///
/// Identifier arrays are re-sorted and deduplicated, so hand-edited files are
/// accepted.
pub fn read_json<R: Read>(reader: R) -> Result<InvertedIndex> {
    let postings: Postings = serde_json::from_reader(reader)?;
    Ok(InvertedIndex::from_postings(postings))
}

pub fn write_json_file<P: AsRef<Path>>(index: &InvertedIndex, path: P) -> Result<()> {
    write_atomically(path.as_ref(), |writer| write_json(index, writer))
}

pub fn read_json_file<P: AsRef<Path>>(path: P) -> Result<InvertedIndex> {
    read_json(BufReader::new(File::open(path)?))
}

/// Write `index` in the binary snapshot format.
#[cfg(feature = "snapshot")]
pub fn write_snapshot<W: Write>(index: &InvertedIndex, mut writer: W) -> Result<()> {
    writer.write_all(SNAPSHOT_MAGIC)?;
    writer.write_all(&[SNAPSHOT_VERSION])?;
    bincode::serialize_into(&mut writer, &index.to_sorted_map())?;
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
///
/// Fails with `InvalidFormat` when the header or version does not match.
#[cfg(feature = "snapshot")]
pub fn read_snapshot<R: Read>(mut reader: R) -> Result<InvertedIndex> {
    let mut header = [0u8; SNAPSHOT_MAGIC.len() + 1];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => CityQueryError::InvalidFormat,
        _ => CityQueryError::Io(e),
    })?;

    let (magic, version) = header.split_at(SNAPSHOT_MAGIC.len());
    if magic != SNAPSHOT_MAGIC || version[0] != SNAPSHOT_VERSION {
        return Err(CityQueryError::InvalidFormat);
    }

    let postings: Postings = bincode::deserialize_from(reader)?;
    Ok(InvertedIndex::from_postings(postings))
}

#[cfg(feature = "snapshot")]
pub fn write_snapshot_file<P: AsRef<Path>>(index: &InvertedIndex, path: P) -> Result<()> {
    write_atomically(path.as_ref(), |writer| write_snapshot(index, writer))
}

#[cfg(feature = "snapshot")]
pub fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<InvertedIndex> {
    read_snapshot(BufReader::new(File::open(path)?))
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let temp_path = temp_path(path);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)?;

    let result = write_and_sync(file, write).and_then(|()| Ok(std::fs::rename(&temp_path, path)?));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn write_and_sync<F>(file: File, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    if let Some(name) = temp.file_name() {
        let mut new_name = name.to_string_lossy().into_owned();
        new_name.push_str(".tmp");
        temp.set_file_name(new_name);
    }
    temp
}
