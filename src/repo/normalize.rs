//! Raw repository string classification.
//!
//! Repo arguments arrive as filesystem paths or URLs. Absolute paths are
//! rewritten to file:// URLs; URLs with an unsupported scheme are dropped
//! (an absent result, not an error - the registrar logs and moves on).

/// URL schemes accepted as package sources.
const ACCEPTED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "file"];

/// Normalize a raw repo string into a usable URL.
///
/// - absolute paths become `file://<path>`
/// - URLs with an accepted scheme pass through unchanged
/// - everything else yields `None`
pub fn normalize_source(raw: &str) -> Option<String> {
    if raw.starts_with('/') {
        return Some(format!("file://{}", raw));
    }
    if let Some((scheme, _)) = raw.split_once("://") {
        if ACCEPTED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return Some(raw.to_string());
        }
    }
    None
}

/// Substitute the release version into a repo URL.
///
/// Mirror URLs conventionally carry a `$releasever` placeholder (brace
/// form included); it must be resolved before anything is fetched.
pub fn substitute_releasever(url: &str, releasever: &str) -> String {
    url.replace("${releasever}", releasever)
        .replace("$releasever", releasever)
}

/// True if the raw string names a source-RPM repo.
///
/// Checked on the raw, pre-normalization string: source repos are never
/// package sources for an install tree, whatever their scheme.
pub fn is_srpm(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains("srpm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_becomes_file_url() {
        assert_eq!(
            normalize_source("/srv/repo").as_deref(),
            Some("file:///srv/repo")
        );
    }

    #[test]
    fn test_accepted_schemes_pass_through() {
        for url in [
            "http://example.com/repo",
            "https://example.com/repo",
            "ftp://example.com/repo",
            "file:///srv/repo",
        ] {
            assert_eq!(normalize_source(url).as_deref(), Some(url));
        }
    }

    #[test]
    fn test_scheme_match_is_case_insensitive() {
        assert!(normalize_source("HTTPS://example.com/repo").is_some());
    }

    #[test]
    fn test_unsupported_scheme_is_dropped() {
        assert!(normalize_source("gopher://example.com/repo").is_none());
        assert!(normalize_source("nfs://server/repo").is_none());
        assert!(normalize_source("relative/path").is_none());
        assert!(normalize_source("example.com/repo").is_none());
    }

    #[test]
    fn test_releasever_substitution() {
        assert_eq!(
            substitute_releasever("https://mirror/fedora/$releasever/x86_64/os/", "42"),
            "https://mirror/fedora/42/x86_64/os/"
        );
        assert_eq!(
            substitute_releasever("https://mirror/fedora/${releasever}/os/", "42"),
            "https://mirror/fedora/42/os/"
        );
        assert_eq!(
            substitute_releasever("https://mirror/plain/os/", "42"),
            "https://mirror/plain/os/"
        );
    }

    #[test]
    fn test_srpm_substring_any_case() {
        assert!(is_srpm("/path/SRPM"));
        assert!(is_srpm("https://x/srpms/"));
        assert!(is_srpm("http://mirror/Srpm-extras"));
        assert!(!is_srpm("https://x/packages/"));
    }
}
