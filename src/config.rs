use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "powertest.yaml";

/// Prompt defaults. Values come from an optional `powertest.yaml` in the
/// working directory; anything the operator types at the prompts wins over
/// these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub scheme: String,
    pub wordlist: PathBuf,
    pub extensions: String,
    pub gobuster_threads: u32,
    pub sqlmap_threads: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            wordlist: PathBuf::from("/usr/share/wordlists/dirbuster/directory-list-2.3-medium.txt"),
            extensions: "php,html,txt,asp,aspx".to_string(),
            gobuster_threads: 50,
            sqlmap_threads: 5,
        }
    }
}

impl Defaults {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let defaults: Defaults = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))?;
        Ok(defaults)
    }

    /// Load `powertest.yaml` from the current directory if present, otherwise
    /// fall back to the built-in defaults.
    pub fn discover() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn built_in_defaults_match_reference_values() {
        let defaults = Defaults::default();
        assert_eq!(defaults.scheme, "http");
        assert_eq!(defaults.extensions, "php,html,txt,asp,aspx");
        assert_eq!(defaults.gobuster_threads, 50);
        assert_eq!(defaults.sqlmap_threads, 5);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("powertest.yaml");
        fs::write(&path, "scheme: https\ngobuster_threads: 20\n").unwrap();

        let defaults = Defaults::load(&path).unwrap();
        assert_eq!(defaults.scheme, "https");
        assert_eq!(defaults.gobuster_threads, 20);
        assert_eq!(defaults.sqlmap_threads, 5);
        assert_eq!(defaults.extensions, "php,html,txt,asp,aspx");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("powertest.yaml");
        fs::write(&path, "scheme: [unclosed").unwrap();
        assert!(Defaults::load(&path).is_err());
    }
}
