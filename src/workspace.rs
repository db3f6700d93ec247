//! Temporary workspace management.
//!
//! The build works inside a single work directory with a fixed layout:
//! `installtree/` (where the engine assembles the tree) and `dnf/` (package
//! manager state, plus `dnf.cache/`, `dnf.logs/` and `dnf.repos/` siblings
//! created on demand). The directory is either generated under a tmp root
//! or supplied by the caller; only generated directories are ever removed
//! by cleanup.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A staged work directory for one build run.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    /// True if this process generated the directory and may delete it.
    owned: bool,
}

impl Workspace {
    /// Create or reuse a work directory.
    ///
    /// With `explicit` set, that directory is used as-is (created if
    /// missing) and never removed by `cleanup()`. Otherwise a fresh
    /// `treeforge.*` directory is generated under `tmp_root`.
    pub fn create(explicit: Option<PathBuf>, tmp_root: &Path) -> Result<Self> {
        let (root, owned) = match explicit {
            Some(dir) => {
                fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create work directory {}", dir.display())
                })?;
                (dir, false)
            }
            None => {
                fs::create_dir_all(tmp_root).with_context(|| {
                    format!("Failed to create tmp root {}", tmp_root.display())
                })?;
                let dir = tempfile::Builder::new()
                    .prefix("treeforge.")
                    .tempdir_in(tmp_root)
                    .with_context(|| {
                        format!("Failed to create work directory under {}", tmp_root.display())
                    })?;
                // Lifetime is managed by cleanup(), not by drop
                (dir.keep(), true)
            }
        };

        let workspace = Self { root, owned };
        fs::create_dir_all(workspace.installtree_dir())?;
        fs::create_dir_all(workspace.dnf_dir())?;
        Ok(workspace)
    }

    /// Work directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if the directory was auto-generated (and so removable).
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Installroot the engine populates.
    pub fn installtree_dir(&self) -> PathBuf {
        self.root.join("installtree")
    }

    /// Package manager working directory.
    pub fn dnf_dir(&self) -> PathBuf {
        self.root.join("dnf")
    }

    /// Default metadata cache directory (used unless --cachedir is given).
    pub fn default_cachedir(&self) -> PathBuf {
        self.root.join("dnf.cache")
    }

    /// Default package manager log directory.
    pub fn default_logdir(&self) -> PathBuf {
        self.root.join("dnf.logs")
    }

    /// Staging directory for copies of user-supplied .repo files.
    pub fn repo_staging_dir(&self) -> PathBuf {
        self.root.join("dnf.repos")
    }

    /// Remove the work directory, but only if this process generated it.
    /// Caller-supplied work directories are always preserved. Idempotent.
    pub fn cleanup(&self) {
        if self.owned {
            let _ = fs::remove_dir_all(&self.root);
        }
    }
}
