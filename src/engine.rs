//! Hand-off to the external tree-assembly engine.
//!
//! Treeforge stops at a resolved repository context; the engine owns
//! dependency solving, template rendering and image packaging. The
//! hand-off is a JSON manifest written into the workspace plus a
//! streaming invocation of the engine binary.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogContext;
use crate::process::Cmd;
use crate::repo::{RepoEntry, ResolutionContext};
use crate::workspace::Workspace;

/// Resolved build parameters passed to the engine.
#[derive(Debug, Clone, Serialize)]
pub struct BuildParams {
    pub product: String,
    pub version: String,
    pub release: String,
    pub variant: Option<String>,
    pub bugurl: Option<String>,
    /// Final release build (affects branding templates).
    pub isfinal: bool,
    pub volid: Option<String>,
    pub buildarch: Option<String>,
    /// Extra packages installed into the tree.
    pub installpkgs: Vec<String>,
    /// Package patterns excluded from the tree.
    pub excludepkgs: Vec<String>,
    /// Root filesystem image size in GiB.
    pub rootfs_size: u64,
    pub sharedir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Global template-variable overrides.
    pub template_vars: HashMap<String, String>,
    /// Architecture-specific template-variable overrides.
    pub arch_template_vars: HashMap<String, String>,
    /// Verify installed files after the transaction.
    pub verify: bool,
}

/// Everything the engine needs for one run.
#[derive(Serialize)]
struct BuildManifest<'a> {
    params: &'a BuildParams,
    repos: &'a [RepoEntry],
    installroot: &'a Path,
    cachedir: &'a Path,
    logdir: &'a Path,
    releasever: &'a str,
    outputdir: &'a Path,
}

/// Serialize the build manifest into the workspace.
///
/// Returns the manifest path. Split out from `run_engine` so tests can
/// check the hand-off contents without an engine binary installed.
pub fn write_manifest(
    ctx: &ResolutionContext,
    params: &BuildParams,
    workspace: &Workspace,
    outputdir: &Path,
) -> Result<PathBuf> {
    let manifest = BuildManifest {
        params,
        repos: ctx.repos(),
        installroot: &ctx.installroot,
        cachedir: &ctx.cachedir,
        logdir: &ctx.logdir,
        releasever: &ctx.releasever,
        outputdir,
    };

    let path = workspace.dnf_dir().join("build.json");
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write build manifest {}", path.display()))?;
    Ok(path)
}

/// Find the engine binary.
pub fn find_engine_binary() -> Result<PathBuf> {
    // Priority 1: TREEFORGE_ENGINE env var
    if let Ok(path) = std::env::var("TREEFORGE_ENGINE") {
        let path = PathBuf::from(&path);
        if path.exists() {
            return Ok(path);
        }
        bail!("TREEFORGE_ENGINE is set but {} does not exist", path.display());
    }

    // Priority 2: system PATH
    if let Ok(path) = which::which("treeforge-engine") {
        return Ok(path);
    }

    bail!(
        "treeforge-engine binary not found.\n\
         Install it, or set TREEFORGE_ENGINE to the binary path."
    )
}

/// Run the engine against the resolved context.
pub fn run_engine(
    log: &LogContext,
    ctx: &ResolutionContext,
    params: &BuildParams,
    workspace: &Workspace,
    outputdir: &Path,
) -> Result<()> {
    let manifest = write_manifest(ctx, params, workspace, outputdir)?;
    let engine = find_engine_binary()?;

    log.info(&format!(
        "Handing off to {} (manifest: {})",
        engine.display(),
        manifest.display()
    ));

    Cmd::new(engine)
        .arg("--manifest")
        .arg_path(&manifest)
        .run_streaming()
        .context("Tree assembly failed")?;

    Ok(())
}
