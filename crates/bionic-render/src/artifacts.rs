// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scratch space for intermediate chunk PDFs. Everything lives under one
// temporary directory that is removed when the arena is dropped, whether the
// job finished, failed, or unwound.

use std::path::{Path, PathBuf};

use bionic_core::Result;
use tempfile::TempDir;
use tracing::{debug, warn};

const PREFIX: &str = "bionic-chunks-";

#[derive(Debug)]
pub struct ArtifactArena {
    dir: TempDir,
}

impl ArtifactArena {
    /// Arena under the system temporary directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "Artifact arena created");
        Ok(Self { dir })
    }

    /// Arena under `parent`, which must exist.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "Artifact arena created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where chunk `index` is rendered to. Zero-padded so directory listings
    /// sort in document order.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("chunk-{index:05}.pdf"))
    }

    /// Delete one artifact as soon as it is no longer needed.
    pub fn release(&self, path: &Path) {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), %err, "could not remove chunk artifact");
        }
    }

    /// Number of files still in the arena.
    pub fn remaining(&self) -> Result<usize> {
        Ok(std::fs::read_dir(self.dir.path())?.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_paths_sort_in_order() {
        let arena = ArtifactArena::new().unwrap();
        let a = arena.chunk_path(9);
        let b = arena.chunk_path(10);
        assert!(a < b);
        assert!(a.starts_with(arena.path()));
    }

    #[test]
    fn release_and_drop_clean_up() {
        let parent = tempfile::tempdir().unwrap();
        let arena = ArtifactArena::new_in(parent.path()).unwrap();
        let first = arena.chunk_path(0);
        std::fs::write(&first, b"%PDF").unwrap();
        std::fs::write(arena.chunk_path(1), b"%PDF").unwrap();
        assert_eq!(arena.remaining().unwrap(), 2);

        arena.release(&first);
        assert_eq!(arena.remaining().unwrap(), 1);

        let root = arena.path().to_path_buf();
        drop(arena);
        assert!(!root.exists());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }
}
