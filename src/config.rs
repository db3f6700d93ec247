//! Configuration management for treeforge.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over .env (main calls
//! `dotenvy::dotenv()` before loading, and dotenvy never overrides
//! variables that are already set).

use std::path::PathBuf;

use crate::logging::LogContext;

/// Default root for auto-generated work directories.
pub const DEFAULT_TMP_ROOT: &str = "/var/tmp";

/// Default release version substituted into repo URLs and templates.
pub const DEFAULT_RELEASEVER: &str = "rawhide";

/// Treeforge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for auto-generated work directories (TREEFORGE_TMP).
    pub tmp_root: PathBuf,
    /// Proxy URL applied to every registered repository (TREEFORGE_PROXY).
    pub proxy: Option<String>,
    /// Release version (TREEFORGE_RELEASEVER).
    pub releasever: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        let tmp_root = std::env::var("TREEFORGE_TMP")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TMP_ROOT));

        let proxy = std::env::var("TREEFORGE_PROXY").ok().filter(|s| !s.is_empty());

        let releasever = std::env::var("TREEFORGE_RELEASEVER")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_RELEASEVER.to_string());

        Self {
            tmp_root,
            proxy,
            releasever,
        }
    }

    /// Log the effective configuration for debugging.
    pub fn log(&self, log: &LogContext) {
        log.debug(&format!("TREEFORGE_TMP: {}", self.tmp_root.display()));
        log.debug(&format!(
            "TREEFORGE_PROXY: {}",
            self.proxy.as_deref().unwrap_or("(unset)")
        ));
        log.debug(&format!("TREEFORGE_RELEASEVER: {}", self.releasever));
    }
}
