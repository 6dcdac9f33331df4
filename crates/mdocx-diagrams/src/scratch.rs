//! Scratch directory for intermediate diagram files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const PREFIX: &str = "mdocx-diagrams-";

/// Directory holding intermediate files for one diagram run.
///
/// Always a private directory created for this run and removed on drop.
/// A configured location only chooses where it is created; entries
/// already there are never touched.
#[derive(Debug)]
pub struct ScratchDir {
    temp: TempDir,
}

impl ScratchDir {
    /// Create a private scratch directory under the system temp dir
    pub fn temporary() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        Ok(Self { temp })
    }

    /// Create a private scratch directory inside `parent`, creating
    /// `parent` if needed
    pub fn at(parent: impl Into<PathBuf>) -> io::Result<Self> {
        let parent = parent.into();
        fs::create_dir_all(&parent)?;
        let temp = tempfile::Builder::new().prefix(PREFIX).tempdir_in(&parent)?;
        Ok(Self { temp })
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Remove every entry inside the directory
    pub fn clear(&self) -> io::Result<()> {
        for entry in fs::read_dir(self.path())? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Guard that empties the directory when dropped
    pub fn guard(&self) -> ScratchGuard<'_> {
        ScratchGuard { dir: self }
    }
}

/// Empties a [`ScratchDir`] on drop, including during unwinding
pub struct ScratchGuard<'a> {
    dir: &'a ScratchDir,
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.dir.clear() {
            log::warn!(
                "Failed to empty scratch directory {}: {}",
                self.dir.path().display(),
                e
            );
        }
    }
}
