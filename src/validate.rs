//! Argument and filesystem precondition checks.
//!
//! Everything here runs before any workspace is created, so input errors
//! never leave a half-staged temp directory behind.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Check the flag combinations and paths the build depends on.
pub fn check_preconditions(
    sources: &[String],
    repo_files: &[PathBuf],
    outputdir: &Path,
    force: bool,
    config: Option<&Path>,
    sharedir: Option<&Path>,
) -> Result<()> {
    if sources.is_empty() && repo_files.is_empty() {
        bail!("No repository given: pass at least one --source or --repo");
    }

    if outputdir.exists() && !force {
        bail!(
            "Output directory {} already exists: pass --force to overwrite it",
            outputdir.display()
        );
    }

    if let Some(config) = config {
        if !config.is_file() {
            bail!("Config file {} does not exist", config.display());
        }
    }

    if let Some(sharedir) = sharedir {
        if !sharedir.is_dir() {
            bail!("Share directory {} does not exist", sharedir.display());
        }
    }

    Ok(())
}

/// Expand --repo arguments into concrete .repo file paths.
///
/// Each argument is either a .repo file, taken as-is, or a directory whose
/// `.repo` files are collected (sorted for deterministic load order).
/// A missing path is an input error.
pub fn expand_repo_files(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        if arg.is_file() {
            files.push(arg.clone());
        } else if arg.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(arg)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "repo"))
                .collect();
            found.sort();
            if found.is_empty() {
                bail!("No .repo files found in {}", arg.display());
            }
            files.extend(found);
        } else {
            bail!("Repo file {} does not exist", arg.display());
        }
    }
    Ok(files)
}
