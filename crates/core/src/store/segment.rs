//! Per-container segment files.
//!
//! One segment holds the complete entry set of one container, MessagePack
//! encoded and zstd compressed, named after the xxh3 hash of the container
//! key. Writes go through a temp file and a rename so a reader never sees a
//! half-written segment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Result, SymdexError};
use crate::store::ContainerIndex;

pub const SEGMENT_VERSION: u32 = 1;
pub const SEGMENT_EXT: &str = "seg";

#[derive(Serialize)]
struct SegmentFileRef<'a> {
    version: u32,
    index: &'a ContainerIndex,
}

#[derive(Deserialize)]
struct SegmentFile {
    version: u32,
    index: ContainerIndex,
}

pub fn segment_path(dir: &Path, container_key: &str) -> PathBuf {
    dir.join(format!(
        "{:016x}.{SEGMENT_EXT}",
        xxh3_64(container_key.as_bytes())
    ))
}

pub fn save(dir: &Path, index: &ContainerIndex) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let packed = rmp_serde::to_vec(&SegmentFileRef {
        version: SEGMENT_VERSION,
        index,
    })
    .map_err(|e| SymdexError::Storage(format!("MSGPACK error: {e}")))?;
    let compressed = zstd::encode_all(&packed[..], 0)
        .map_err(|e| SymdexError::Storage(format!("Zstd compression failed: {e}")))?;

    let path = segment_path(dir, &index.container.key());
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, compressed)?;
    std::fs::rename(&temp_path, &path)?;

    Ok(path)
}

/// Loads one segment. A missing file, a version mismatch or a corrupt
/// payload yields `None`; the file itself is left alone (it may belong to a
/// read-only shared artifact).
pub fn load(path: &Path) -> Result<Option<ContainerIndex>> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(path)?;
    let unpacked = zstd::decode_all(&bytes[..])
        .map_err(|e| SymdexError::Storage(format!("Zstd decompression failed: {e}")))?;

    match rmp_serde::from_slice::<SegmentFile>(&unpacked) {
        Ok(segment) if segment.version == SEGMENT_VERSION => Ok(Some(segment.index)),
        Ok(segment) => {
            tracing::warn!(
                "Segment version mismatch at {} (found {}, expected {}). Will rebuild.",
                path.display(),
                segment.version,
                SEGMENT_VERSION
            );
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("Failed to parse segment at {}: {e:?}. Will rebuild.", path.display());
            Ok(None)
        }
    }
}

pub fn load_dir(dir: &Path) -> Result<Vec<ContainerIndex>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXT) {
            continue;
        }
        match load(&path) {
            Ok(Some(index)) => out.push(index),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("Skipping unreadable segment {}: {err}", path.display());
            }
        }
    }

    Ok(out)
}

pub fn remove(dir: &Path, container_key: &str) -> Result<()> {
    let path = segment_path(dir, container_key);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Deletes every segment file in the directory. Only segment files are
/// touched; anything else sharing the directory survives.
pub fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXT) {
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}
