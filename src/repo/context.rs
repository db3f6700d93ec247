//! The repository resolution context.
//!
//! An accumulating structure created once per run: registration appends
//! repo entries, metadata loads attach their fetched indexes, and the
//! engine hand-off consumes the result. After metadata load, entries only
//! change through explicit enable/disable overrides.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::fetch::{MetadataFetcher, RepoMd};
use super::normalize;

/// Where a repo's packages come from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoUrls {
    /// One or more direct base URLs.
    BaseUrls(Vec<String>),
    /// A URL returning a list of mirrors.
    Mirrorlist(String),
}

/// A single registered repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoEntry {
    /// Generated or .repo-file-defined repo id.
    pub name: String,
    pub urls: RepoUrls,
    pub enabled: bool,
    /// Proxy for this repo's fetches, if any.
    pub proxy: Option<String>,
}

/// Resolution context: registered repos plus the paths and settings the
/// package layer needs.
#[derive(Debug)]
pub struct ResolutionContext {
    pub installroot: PathBuf,
    pub cachedir: PathBuf,
    pub logdir: PathBuf,
    /// Staging directory holding copies of user-supplied .repo files.
    pub repo_dir: Option<PathBuf>,
    pub releasever: String,
    /// Proxy applied to every directly-registered repo.
    pub proxy: Option<String>,
    repos: Vec<RepoEntry>,
    metadata: HashMap<String, RepoMd>,
    comps: HashMap<String, PathBuf>,
    sack_filled: bool,
}

impl ResolutionContext {
    pub fn new(
        installroot: PathBuf,
        cachedir: PathBuf,
        logdir: PathBuf,
        releasever: String,
        proxy: Option<String>,
    ) -> Self {
        Self {
            installroot,
            cachedir,
            logdir,
            repo_dir: None,
            releasever,
            proxy,
            repos: Vec::new(),
            metadata: HashMap::new(),
            comps: HashMap::new(),
            sack_filled: false,
        }
    }

    /// Registered repos, in registration order.
    pub fn repos(&self) -> &[RepoEntry] {
        &self.repos
    }

    pub fn repo(&self, name: &str) -> Option<&RepoEntry> {
        self.repos.iter().find(|r| r.name == name)
    }

    /// Fetched metadata for a repo, if loaded.
    pub fn metadata(&self, name: &str) -> Option<&RepoMd> {
        self.metadata.get(name)
    }

    /// Local path of a repo's fetched comps file, if it has one.
    pub fn comps(&self, name: &str) -> Option<&Path> {
        self.comps.get(name).map(PathBuf::as_path)
    }

    /// True once the full available-package set has been resolved.
    pub fn sack_filled(&self) -> bool {
        self.sack_filled
    }

    /// Register a repo with direct base URLs. Enabled by default.
    pub fn add_base_repo(
        &mut self,
        name: String,
        urls: Vec<String>,
        proxy: Option<String>,
    ) -> RepoEntry {
        let entry = RepoEntry {
            name,
            urls: RepoUrls::BaseUrls(urls),
            enabled: true,
            proxy,
        };
        self.repos.push(entry.clone());
        entry
    }

    /// Register a repo behind a mirrorlist URL. Enabled by default.
    pub fn add_mirrorlist_repo(
        &mut self,
        name: String,
        url: String,
        proxy: Option<String>,
    ) -> RepoEntry {
        let entry = RepoEntry {
            name,
            urls: RepoUrls::Mirrorlist(url),
            enabled: true,
            proxy,
        };
        self.repos.push(entry.clone());
        entry
    }

    /// Attach fetched metadata to a registered repo.
    pub fn record_metadata(&mut self, name: &str, md: RepoMd) {
        self.metadata.insert(name.to_string(), md);
    }

    /// Load every repo defined in a .repo file.
    ///
    /// The format is the usual INI layout: one `[id]` section per repo with
    /// `baseurl` (whitespace-separated URLs, repeatable), `mirrorlist` or
    /// `metalink`, `enabled`, and `proxy` keys. The registrar never
    /// overrides the proxy of file-defined repos; only the file's own
    /// setting applies. Returns the number of repos added.
    pub fn load_repo_file(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read repo file {}", path.display()))?;

        let mut added = 0;
        let mut current: Option<RepoFileSection> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                if let Some(section) = current.take() {
                    added += self.finish_repo_section(section, path)?;
                }
                current = Some(RepoFileSection::new(&line[1..line.len() - 1]));
                continue;
            }

            let Some(section) = current.as_mut() else {
                bail!(
                    "Malformed repo file {}: key before any [section]",
                    path.display()
                );
            };
            let Some((key, value)) = line.split_once('=') else {
                bail!(
                    "Malformed repo file {}: expected key=value, got '{}'",
                    path.display(),
                    line
                );
            };
            section.set(key.trim(), value.trim());
        }

        if let Some(section) = current {
            added += self.finish_repo_section(section, path)?;
        }

        Ok(added)
    }

    fn finish_repo_section(&mut self, section: RepoFileSection, path: &Path) -> Result<usize> {
        // .repo files carry $releasever placeholders; resolve them here so
        // every registered URL is fetchable as-is
        let urls = if !section.baseurls.is_empty() {
            RepoUrls::BaseUrls(
                section
                    .baseurls
                    .iter()
                    .map(|u| normalize::substitute_releasever(u, &self.releasever))
                    .collect(),
            )
        } else if let Some(url) = section.mirrorlist {
            RepoUrls::Mirrorlist(normalize::substitute_releasever(&url, &self.releasever))
        } else {
            bail!(
                "Repo '{}' in {} has neither baseurl nor mirrorlist",
                section.id,
                path.display()
            );
        };

        self.repos.push(RepoEntry {
            name: section.id,
            urls,
            enabled: section.enabled,
            proxy: section.proxy,
        });
        Ok(1)
    }

    /// Enable every registered repo whose name matches the glob pattern.
    /// Returns the number of repos matched (zero is a no-op, not an error).
    pub fn enable_matching(&mut self, pattern: &str) -> usize {
        self.set_enabled_matching(pattern, true)
    }

    /// Disable every registered repo whose name matches the glob pattern.
    pub fn disable_matching(&mut self, pattern: &str) -> usize {
        self.set_enabled_matching(pattern, false)
    }

    fn set_enabled_matching(&mut self, pattern: &str, enabled: bool) -> usize {
        let mut matched = 0;
        for repo in &mut self.repos {
            if glob_match(pattern, &repo.name) {
                repo.enabled = enabled;
                matched += 1;
            }
        }
        matched
    }

    /// Resolve the full available-package set across all enabled repos.
    ///
    /// Any enabled repo still missing metadata (repos loaded from .repo
    /// files) is fetched now, fail-fast. Installed-system package state is
    /// never consulted; the sack covers exactly the enabled repos.
    pub fn fill_sack(&mut self, fetcher: &dyn MetadataFetcher) -> Result<()> {
        let pending: Vec<RepoEntry> = self
            .repos
            .iter()
            .filter(|r| r.enabled && !self.metadata.contains_key(&r.name))
            .cloned()
            .collect();

        for entry in pending {
            let md = fetcher
                .fetch_repomd(&entry)
                .with_context(|| format!("Failed to fetch metadata for repo '{}'", entry.name))?;
            self.metadata.insert(entry.name.clone(), md);
        }

        self.sack_filled = true;
        Ok(())
    }

    /// Fetch group (comps) metadata for enabled repos that publish it.
    /// Repos without a comps record are skipped; fetch failures abort.
    pub fn load_comps(&mut self, fetcher: &dyn MetadataFetcher) -> Result<()> {
        let mut jobs = Vec::new();
        for repo in self.repos.iter().filter(|r| r.enabled) {
            let Some(md) = self.metadata.get(&repo.name) else {
                continue;
            };
            let Some(record) = md.comps_record() else {
                continue;
            };

            let url = format!("{}/{}", md.base_url.trim_end_matches('/'), record.href);
            let file_name = record.href.rsplit('/').next().unwrap_or("comps.xml");
            let dest = self.cachedir.join(&repo.name).join(file_name);
            jobs.push((repo.name.clone(), url, dest, repo.proxy.clone()));
        }

        for (name, url, dest, proxy) in jobs {
            fetcher
                .fetch_file(&url, &dest, proxy.as_deref())
                .with_context(|| format!("Failed to fetch comps for repo '{}'", name))?;
            self.comps.insert(name, dest);
        }
        Ok(())
    }
}

/// Accumulator for one `[section]` of a .repo file.
struct RepoFileSection {
    id: String,
    baseurls: Vec<String>,
    mirrorlist: Option<String>,
    enabled: bool,
    proxy: Option<String>,
}

impl RepoFileSection {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            baseurls: Vec::new(),
            mirrorlist: None,
            enabled: true,
            proxy: None,
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "baseurl" => self
                .baseurls
                .extend(value.split_whitespace().map(str::to_string)),
            "mirrorlist" | "metalink" => self.mirrorlist = Some(value.to_string()),
            "enabled" => self.enabled = matches!(value, "1" | "true" | "yes"),
            "proxy" => self.proxy = Some(value.to_string()),
            // name, gpgcheck, gpgkey etc. don't affect registration
            _ => {}
        }
    }
}

/// Shell-style glob match supporting `*` and `?`.
///
/// Works on chars so `?` matches one character, not one byte, and
/// backtracks to the last `*` instead of recursing, so stacked stars
/// stay linear.
fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star_pi, star_ni)) = backtrack {
            // Let the last * swallow one more character and retry
            pi = star_pi + 1;
            ni = star_ni + 1;
            backtrack = Some((star_pi, star_ni + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
