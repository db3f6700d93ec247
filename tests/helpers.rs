//! Shared test utilities for treeforge tests.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use treeforge::logging::{LogContext, LogLevel};
use treeforge::repo::{MetadataFetcher, RepoEntry, RepoMd, RepoMdRecord, RepoUrls, ResolutionContext};

/// Test environment with a temporary directory tree.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory for workspaces, caches and repo files
    pub base_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_dir,
        }
    }

    /// A fresh, empty resolution context rooted in this environment.
    pub fn context(&self) -> ResolutionContext {
        ResolutionContext::new(
            self.base_dir.join("installtree"),
            self.base_dir.join("dnf.cache"),
            self.base_dir.join("dnf.logs"),
            "42".to_string(),
            None,
        )
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.base_dir.join("dnf.repos")
    }
}

/// Log context that only surfaces errors, to keep test output quiet.
pub fn quiet_log() -> LogContext {
    LogContext::console(LogLevel::Error)
}

/// Scripted metadata fetcher: records fetch order, fails on demand.
pub struct FakeFetcher {
    /// Repo names whose metadata fetch should fail.
    pub fail_on: HashSet<String>,
    /// Repo names whose repomd should advertise a comps file.
    pub comps_for: HashSet<String>,
    /// Repo names in the order their metadata was fetched.
    pub fetched: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            fail_on: HashSet::new(),
            comps_for: HashSet::new(),
            fetched: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_on(names: &[&str]) -> Self {
        let mut fetcher = Self::new();
        fetcher.fail_on = names.iter().map(|s| s.to_string()).collect();
        fetcher
    }

    pub fn fetch_order(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl MetadataFetcher for FakeFetcher {
    fn fetch_repomd(&self, entry: &RepoEntry) -> Result<RepoMd> {
        self.fetched.borrow_mut().push(entry.name.clone());

        if self.fail_on.contains(&entry.name) {
            bail!("simulated metadata fetch failure for {}", entry.name);
        }

        let base_url = match &entry.urls {
            RepoUrls::BaseUrls(urls) => urls.first().cloned().unwrap_or_default(),
            RepoUrls::Mirrorlist(url) => format!("{}/resolved-mirror", url),
        };

        let mut records = vec![
            RepoMdRecord {
                mdtype: "primary".to_string(),
                href: "repodata/primary.xml.gz".to_string(),
            },
            RepoMdRecord {
                mdtype: "filelists".to_string(),
                href: "repodata/filelists.xml.gz".to_string(),
            },
        ];
        if self.comps_for.contains(&entry.name) {
            records.push(RepoMdRecord {
                mdtype: "group".to_string(),
                href: "repodata/comps.xml".to_string(),
            });
        }

        Ok(RepoMd {
            base_url,
            records,
            local_path: PathBuf::from("/tmp/fake-repomd.xml"),
        })
    }

    fn fetch_file(&self, _url: &str, dest: &Path, _proxy: Option<&str>) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, "<comps/>")?;
        Ok(())
    }
}
