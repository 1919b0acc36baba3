//! Local-disk artifact storage.
//!
//! Artifacts are written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written index or metadata file under its
//! final name.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{GlimpseError, Result};

/// Read a whole artifact into memory.
pub fn read_artifact(path: &Path) -> Result<Bytes> {
    let data = std::fs::read(path).map_err(|source| GlimpseError::ArtifactUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = data.len(), "read artifact");
    Ok(Bytes::from(data))
}

/// Write an artifact atomically: temp file, fsync, rename.
pub fn write_artifact(path: &Path, data: &[u8]) -> Result<()> {
    stage_artifact(path, data)?.commit()
}

/// Write `data` to the temp sibling of `path` without touching `path`.
///
/// The returned handle renames it into place on `commit`; dropping it
/// uncommitted removes the temp file.
pub fn stage_artifact(path: &Path, data: &[u8]) -> Result<StagedArtifact> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let file = std::fs::File::create(&tmp)?;
    // from here on the temp file is ours; the guard removes it on error
    let staged = StagedArtifact {
        tmp,
        path: path.to_path_buf(),
        committed: false,
    };
    write_and_sync(file, data)?;

    debug!(path = %path.display(), bytes = data.len(), "staged artifact");
    Ok(staged)
}

fn write_and_sync(mut file: File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data)?;
    file.sync_all()
}

/// A fully written temp file waiting to replace its target.
#[derive(Debug)]
pub struct StagedArtifact {
    tmp: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl StagedArtifact {
    pub fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.tmp, &self.path)?;
        self.committed = true;
        debug!(path = %self.path.display(), "committed artifact");
        Ok(())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.tmp) {
                warn!(path = %self.tmp.display(), error = %e, "cannot remove temp artifact");
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
