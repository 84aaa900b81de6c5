//! Configuration types for caret tools.
//!
//! The configuration is stored in `Caret.toml` files at project roots and is
//! found by searching upward from a start directory.
//!
//! ```toml
//! [verify]
//! source-kinds = ["regular", "script"]
//! both-trigger-modes = true
//!
//! [suite]
//! cases-dir = "test-suite/cases"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The standard configuration filename.
pub const CONFIG_FILENAME: &str = "Caret.toml";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Kind of source a fixture is compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    #[default]
    Regular,
    Script,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Regular => f.write_str("regular"),
            SourceKind::Script => f.write_str("script"),
        }
    }
}

/// Defaults for every verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct VerifyConfig {
    /// Source kinds to verify against.
    pub source_kinds: Vec<SourceKind>,
    pub hide_advanced_members: bool,
    /// Trigger with the character before the caret instead of an explicit invoke.
    pub use_previous_char_as_trigger: bool,
    /// Verify both the invoked and the typed-character trigger.
    pub both_trigger_modes: bool,
    /// Also verify with an inline comment right after the caret.
    pub in_front_of_comment: bool,
    /// Also verify with the text truncated at the caret.
    pub at_end_of_file: bool,
    /// For expected items, also verify with the first character of the item typed.
    pub partially_written: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            source_kinds: vec![SourceKind::Regular],
            hide_advanced_members: false,
            use_previous_char_as_trigger: false,
            both_trigger_modes: false,
            in_front_of_comment: true,
            at_end_of_file: true,
            partially_written: true,
        }
    }
}

/// Settings of the case-file runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SuiteConfig {
    /// Directory holding case files, relative to the config file.
    pub cases_dir: Option<PathBuf>,
    /// Worker threads; the rayon default when unset.
    pub threads: Option<usize>,
    /// Only run cases whose name contains this string.
    pub filter: Option<String>,
}

/// The main caret configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaretConfig {
    pub verify: VerifyConfig,
    pub suite: SuiteConfig,
}

impl CaretConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Parse configuration from a string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find the configuration file by searching upward from the given directory.
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let config_path = current.join(CONFIG_FILENAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration by searching upward from the given directory.
    pub fn load_from_dir(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(config_path) = Self::find_config_file(start_dir) {
            let config = Self::load(&config_path)?;
            Ok(Some((config_path, config)))
        } else {
            Ok(None)
        }
    }

    /// The cases directory resolved against the directory of `config_path`.
    pub fn cases_dir(&self, config_path: &Path) -> Option<PathBuf> {
        let dir = self.suite.cases_dir.as_ref()?;
        Some(match config_path.parent() {
            Some(parent) => parent.join(dir),
            None => dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_config() {
        let content = r#"
[verify]
source-kinds = ["regular", "script"]
hide-advanced-members = true
both-trigger-modes = true
at-end-of-file = false

[suite]
cases-dir = "cases"
threads = 4
"#;

        let config = CaretConfig::parse_str(content).unwrap();
        assert_eq!(
            config.verify,
            VerifyConfig {
                source_kinds: vec![SourceKind::Regular, SourceKind::Script],
                hide_advanced_members: true,
                both_trigger_modes: true,
                at_end_of_file: false,
                ..VerifyConfig::default()
            }
        );
        assert_eq!(config.suite.threads, Some(4));
        assert_eq!(
            config.cases_dir(Path::new("/repo/Caret.toml")),
            Some(PathBuf::from("/repo/cases"))
        );
    }

    #[test]
    fn test_empty_config() {
        let config = CaretConfig::parse_str("").unwrap();
        assert_eq!(config, CaretConfig::default());
        assert_eq!(config.verify.source_kinds, vec![SourceKind::Regular]);
        assert!(config.verify.partially_written);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = CaretConfig::parse_str("[verify]\nhide-advanced = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_find_config_file_searches_upward() {
        let root = std::env::temp_dir().join(format!("caret-config-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILENAME), "[suite]\nfilter = \"enum\"\n").unwrap();

        let (path, config) = CaretConfig::load_from_dir(&nested).unwrap().unwrap();
        assert_eq!(path, root.join(CONFIG_FILENAME));
        assert_eq!(config.suite.filter.as_deref(), Some("enum"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
