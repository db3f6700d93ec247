//! Repository metadata fetching.
//!
//! `MetadataFetcher` is the seam between the registrar and the network;
//! the production implementation shells out to curl, tests script their
//! own fetcher. Fetched files land in a cache directory keyed by a hash
//! of the URL.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::process::Cmd;

use super::context::{RepoEntry, RepoUrls};

/// One `<data>` record from a repomd.xml file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMdRecord {
    /// Metadata type ("primary", "filelists", "group", ...).
    pub mdtype: String,
    /// Location relative to the repo base URL.
    pub href: String,
}

/// Parsed repository metadata index.
#[derive(Debug, Clone)]
pub struct RepoMd {
    /// Base URL the records are relative to.
    pub base_url: String,
    /// Records listed in the index.
    pub records: Vec<RepoMdRecord>,
    /// Where the fetched repomd.xml lives in the cache.
    pub local_path: PathBuf,
}

impl RepoMd {
    /// Find a record by metadata type.
    pub fn record(&self, mdtype: &str) -> Option<&RepoMdRecord> {
        self.records.iter().find(|r| r.mdtype == mdtype)
    }

    /// The group (comps) record, if the repo publishes one.
    pub fn comps_record(&self) -> Option<&RepoMdRecord> {
        self.records
            .iter()
            .find(|r| matches!(r.mdtype.as_str(), "group" | "group_gz" | "group_xz"))
    }
}

/// Network seam for repository metadata.
pub trait MetadataFetcher {
    /// Fetch and parse the repomd.xml index for a registered repo.
    fn fetch_repomd(&self, entry: &RepoEntry) -> Result<RepoMd>;

    /// Download a single file to a destination path.
    fn fetch_file(&self, url: &str, dest: &Path, proxy: Option<&str>) -> Result<()>;
}

/// Production fetcher: curl into a cache directory.
pub struct CurlFetcher {
    cachedir: PathBuf,
}

impl CurlFetcher {
    pub fn new(cachedir: PathBuf) -> Self {
        Self { cachedir }
    }

    /// Resolve a mirrorlist URL to its first usable mirror.
    ///
    /// A mirrorlist is a plain-text file with one mirror URL per line;
    /// blank lines and `#` comments are skipped.
    fn resolve_mirrorlist(&self, url: &str, proxy: Option<&str>) -> Result<String> {
        let dest = self
            .cachedir
            .join(cache_key(url))
            .join("mirrorlist.txt");
        self.fetch_file(url, &dest, proxy)?;

        let content = fs::read_to_string(&dest)
            .with_context(|| format!("Failed to read mirrorlist {}", dest.display()))?;

        match first_mirror(&content) {
            Some(mirror) => Ok(mirror),
            None => bail!("Mirrorlist {} contains no mirrors", url),
        }
    }
}

impl MetadataFetcher for CurlFetcher {
    fn fetch_repomd(&self, entry: &RepoEntry) -> Result<RepoMd> {
        let proxy = entry.proxy.as_deref();
        let base_url = match &entry.urls {
            RepoUrls::BaseUrls(urls) => match urls.first() {
                Some(url) => url.clone(),
                None => bail!("Repo '{}' has no base URL", entry.name),
            },
            RepoUrls::Mirrorlist(url) => self.resolve_mirrorlist(url, proxy)?,
        };

        let repomd_url = format!("{}/repodata/repomd.xml", base_url.trim_end_matches('/'));
        let local_path = self
            .cachedir
            .join(cache_key(&repomd_url))
            .join("repomd.xml");
        self.fetch_file(&repomd_url, &local_path, proxy)?;

        let xml = fs::read_to_string(&local_path)
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        Ok(RepoMd {
            base_url,
            records: parse_repomd(&xml),
            local_path,
        })
    }

    fn fetch_file(&self, url: &str, dest: &Path, proxy: Option<&str>) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut cmd = Cmd::new("curl").args(["-L", "--fail", "--silent", "--show-error"]);
        if let Some(proxy) = proxy {
            cmd = cmd.arg("--proxy").arg(proxy);
        }
        cmd.arg("-o")
            .arg_path(dest)
            .arg(url)
            .run()
            .with_context(|| format!("Failed to download {}", url))?;

        Ok(())
    }
}

/// Cache subdirectory name for a URL: a truncated content hash keeps the
/// layout flat and stable across runs.
fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// First non-comment, non-blank line of a mirrorlist body.
fn first_mirror(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Pull `<data type="...">` / `href="..."` pairs out of a repomd.xml.
///
/// A full XML parser is overkill for this fixed, machine-generated format;
/// a linear scan over tag fragments is enough.
pub fn parse_repomd(xml: &str) -> Vec<RepoMdRecord> {
    let mut records = Vec::new();
    let mut current: Option<String> = None;

    for fragment in xml.split('<') {
        if let Some(rest) = fragment.strip_prefix("data type=\"") {
            if let Some(end) = rest.find('"') {
                current = Some(rest[..end].to_string());
            }
        } else if let Some(rest) = fragment.strip_prefix("location href=\"") {
            if let (Some(mdtype), Some(end)) = (current.take(), rest.find('"')) {
                records.push(RepoMdRecord {
                    mdtype,
                    href: rest[..end].to_string(),
                });
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1700000000</revision>
  <data type="primary">
    <checksum type="sha256">abc</checksum>
    <location href="repodata/primary.xml.gz"/>
  </data>
  <data type="filelists">
    <location href="repodata/filelists.xml.gz"/>
  </data>
  <data type="group">
    <location href="repodata/comps.xml"/>
  </data>
</repomd>
"#;

    #[test]
    fn test_parse_repomd_records() {
        let records = parse_repomd(SAMPLE_REPOMD);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].mdtype, "primary");
        assert_eq!(records[0].href, "repodata/primary.xml.gz");
        assert_eq!(records[2].mdtype, "group");
    }

    #[test]
    fn test_parse_repomd_empty_input() {
        assert!(parse_repomd("").is_empty());
        assert!(parse_repomd("not xml at all").is_empty());
    }

    #[test]
    fn test_comps_record_lookup() {
        let md = RepoMd {
            base_url: "http://example.com/repo".to_string(),
            records: parse_repomd(SAMPLE_REPOMD),
            local_path: PathBuf::from("/tmp/repomd.xml"),
        };
        assert_eq!(md.comps_record().unwrap().href, "repodata/comps.xml");
        assert!(md.record("primary").is_some());
        assert!(md.record("modules").is_none());
    }

    #[test]
    fn test_first_mirror_skips_comments() {
        let body = "# generated\n\nhttp://mirror-a/repo\nhttp://mirror-b/repo\n";
        assert_eq!(first_mirror(body).as_deref(), Some("http://mirror-a/repo"));
        assert!(first_mirror("# only comments\n").is_none());
    }

    #[test]
    fn test_cache_key_is_stable_and_short() {
        let a = cache_key("http://example.com/repo");
        let b = cache_key("http://example.com/repo");
        let c = cache_key("http://example.com/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
