//! Template-variable override parsing.
//!
//! The engine's templates accept `key=value` overrides from the command
//! line, in two flavors (global and architecture-specific). Both parse the
//! same way: split on the first `=`, last occurrence of a key wins.

use anyhow::{bail, Result};
use std::collections::HashMap;

/// Parse `key=value` tokens into an override map.
///
/// A token without `=` is a fatal input error. Duplicate keys overwrite
/// earlier values.
pub fn parse_vars(tokens: &[String]) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            bail!("Invalid template variable '{}': expected key=value", token);
        };
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic_pairs() {
        let vars = parse_vars(&strings(&["product=Fedora", "arch=x86_64"])).unwrap();
        assert_eq!(vars.get("product").map(String::as_str), Some("Fedora"));
        assert_eq!(vars.get("arch").map(String::as_str), Some("x86_64"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_missing_equals_is_fatal() {
        let err = parse_vars(&strings(&["badtoken"])).unwrap_err();
        assert!(err.to_string().contains("badtoken"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let vars = parse_vars(&strings(&["a=1", "a=2"])).unwrap();
        assert_eq!(vars.get("a").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let vars = parse_vars(&strings(&["url=http://x/?a=b"])).unwrap();
        assert_eq!(vars.get("url").map(String::as_str), Some("http://x/?a=b"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_vars(&[]).unwrap().is_empty());
    }
}
