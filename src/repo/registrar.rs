//! Repository registration sequencing.
//!
//! Takes the raw repo arguments and produces a fully populated resolution
//! context, or fails. The sequencing rules:
//!
//! - srpm repos are skipped on the raw string, before normalization
//! - invalid schemes are silently dropped (debug trace only)
//! - surviving sources and mirrorlists get dense zero-based names with
//!   independent counters per kind
//! - each repo's metadata is fetched right after registration; the first
//!   fetch failure aborts the whole registration (fail-fast, no retry)
//! - enable patterns apply before disable patterns; unmatched patterns
//!   warn and continue
//!
//! The caller owns workspace cleanup when this returns an error.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogContext;

use super::context::ResolutionContext;
use super::fetch::MetadataFetcher;
use super::normalize;

/// Raw repository arguments from the command line.
#[derive(Debug, Clone, Default)]
pub struct RepoOptions {
    /// Direct source URLs or paths (--source).
    pub sources: Vec<String>,
    /// Mirrorlist URLs (--mirrorlist).
    pub mirrorlists: Vec<String>,
    /// .repo files to stage and load (--repo, already expanded).
    pub repo_files: Vec<PathBuf>,
    /// Repo name patterns to enable (--enablerepo).
    pub enable_patterns: Vec<String>,
    /// Repo name patterns to disable (--disablerepo).
    pub disable_patterns: Vec<String>,
}

/// Register all repositories and load their metadata.
///
/// On success the returned context has a filled sack and loaded comps.
/// On failure the context is dropped; the caller removes the workspace.
pub fn register_repos(
    log: &LogContext,
    mut ctx: ResolutionContext,
    opts: &RepoOptions,
    staging_dir: &Path,
    fetcher: &dyn MetadataFetcher,
) -> Result<ResolutionContext> {
    // The registrar owns creation of the cache and log directories
    fs::create_dir_all(&ctx.cachedir)
        .with_context(|| format!("Failed to create cache dir {}", ctx.cachedir.display()))?;
    fs::create_dir_all(&ctx.logdir)
        .with_context(|| format!("Failed to create log dir {}", ctx.logdir.display()))?;

    if !opts.repo_files.is_empty() {
        stage_repo_files(log, &mut ctx, &opts.repo_files, staging_dir)?;
    }

    register_list(log, &mut ctx, &opts.sources, RepoKind::Source, fetcher)?;
    register_list(log, &mut ctx, &opts.mirrorlists, RepoKind::Mirrorlist, fetcher)?;

    // Enables first, then disables: a repo hit by both ends up disabled
    for pattern in &opts.enable_patterns {
        if ctx.enable_matching(pattern) == 0 {
            log.warn(&format!("No repo matches enable pattern '{}'", pattern));
        }
    }
    for pattern in &opts.disable_patterns {
        if ctx.disable_matching(pattern) == 0 {
            log.warn(&format!("No repo matches disable pattern '{}'", pattern));
        }
    }

    ctx.fill_sack(fetcher)?;
    ctx.load_comps(fetcher)?;

    log.info(&format!(
        "Resolved {} repos ({} enabled)",
        ctx.repos().len(),
        ctx.repos().iter().filter(|r| r.enabled).count()
    ));

    Ok(ctx)
}

enum RepoKind {
    Source,
    Mirrorlist,
}

impl RepoKind {
    fn name_for(&self, index: usize) -> String {
        match self {
            RepoKind::Source => format!("treeforge-repo-{}", index),
            RepoKind::Mirrorlist => format!("treeforge-mirrorlist-{}", index),
        }
    }
}

/// Register one kind of repo list in input order.
///
/// Names are indexed over the entries that survive filtering: skipped
/// entries never consume an index.
fn register_list(
    log: &LogContext,
    ctx: &mut ResolutionContext,
    raw_list: &[String],
    kind: RepoKind,
    fetcher: &dyn MetadataFetcher,
) -> Result<()> {
    let mut index = 0;
    for raw in raw_list {
        if normalize::is_srpm(raw) {
            log.debug(&format!("Skipping source-RPM repo {}", raw));
            continue;
        }

        let Some(url) = normalize::normalize_source(raw) else {
            log.debug(&format!("Dropping repo with unsupported scheme: {}", raw));
            continue;
        };
        let url = normalize::substitute_releasever(&url, &ctx.releasever);

        let entry = match kind {
            RepoKind::Source => {
                ctx.add_base_repo(kind.name_for(index), vec![url], ctx.proxy.clone())
            }
            RepoKind::Mirrorlist => {
                ctx.add_mirrorlist_repo(kind.name_for(index), url, ctx.proxy.clone())
            }
        };
        index += 1;

        // Fetch immediately; one bad repo aborts the whole run
        let md = fetcher
            .fetch_repomd(&entry)
            .with_context(|| format!("Failed to fetch metadata for repo '{}'", entry.name))?;
        ctx.record_metadata(&entry.name, md);
        log.info(&format!("Added repo {}: {}", entry.name, raw));
    }
    Ok(())
}

/// Copy .repo files into the staging directory and bulk-load them.
fn stage_repo_files(
    log: &LogContext,
    ctx: &mut ResolutionContext,
    repo_files: &[PathBuf],
    staging_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(staging_dir)
        .with_context(|| format!("Failed to create {}", staging_dir.display()))?;

    for file in repo_files {
        let Some(file_name) = file.file_name() else {
            bail!("Invalid repo file path: {}", file.display());
        };
        let staged = staging_dir.join(file_name);
        fs::copy(file, &staged).with_context(|| {
            format!("Failed to copy {} into {}", file.display(), staging_dir.display())
        })?;

        let added = ctx.load_repo_file(&staged)?;
        log.info(&format!(
            "Loaded {} repos from {}",
            added,
            file.display()
        ));
    }

    ctx.repo_dir = Some(staging_dir.to_path_buf());
    Ok(())
}
