//! Project-local scan configuration
//!
//! A YAML file at `<scan_root>/depscope.yml` tunes the scan; a sibling
//! `.depscopeignore` (gitignore syntax) augments the `ignore` patterns. An
//! invalid config is fatal: the scan refuses to start rather than running
//! with half-applied settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Confidence;

/// Config file basename looked up under the scan root
pub const CONFIG_BASENAME: &str = "depscope.yml";

/// Ignore file basename looked up under the scan root
pub const IGNORE_BASENAME: &str = ".depscopeignore";

/// Default per-file size cap in MiB
pub const DEFAULT_MAX_FILE_SIZE_MB: f64 = 1.0;

/// Output encoding for the manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

/// A user-supplied SDK mapping compiled into extra analyzer patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSdk {
    /// Package name reported as `sdk_package`
    pub package: String,
    /// Provider tag reported as `provider`
    pub provider: String,
    /// Regex patterns matched against source lines
    pub patterns: Vec<String>,
}

/// Scan configuration, all keys optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub version: Option<u32>,
    pub output: OutputFormat,
    #[serde(rename = "outFile")]
    pub out_file: Option<PathBuf>,
    /// Restrict the plugin set to these language tags (empty = all)
    pub languages: Vec<String>,
    /// Additional scan roots, relative to the primary root
    pub roots: Vec<PathBuf>,
    /// gitignore-syntax patterns, applied relative to the scan root
    pub ignore: Vec<String>,
    /// Highest-priority env source for URL resolution
    pub env: BTreeMap<String, String>,
    /// Custom SDK mappings keyed by a free-form label
    pub sdks: BTreeMap<String, CustomSdk>,
    /// Entries below this confidence are dropped from the manifest
    pub min_confidence: Confidence,
    pub max_file_size_mb: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            version: None,
            output: OutputFormat::default(),
            out_file: None,
            languages: Vec::new(),
            roots: Vec::new(),
            ignore: Vec::new(),
            env: BTreeMap::new(),
            sdks: BTreeMap::new(),
            min_confidence: Confidence::Low,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

/// Configuration errors, all fatal
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("max_file_size_mb must be positive, got {0}")]
    InvalidMaxFileSize(f64),

    #[error("outFile {0} resolves outside the working directory")]
    OutFileEscapes(PathBuf),

    #[error("sdks.{key}: invalid pattern {pattern:?}: {source}")]
    InvalidSdkPattern {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ScanConfig {
    /// Load `<root>/depscope.yml`, falling back to defaults when absent
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_BASENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let config: Self =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_file_size_mb > 0.0) {
            return Err(ConfigError::InvalidMaxFileSize(self.max_file_size_mb));
        }
        for (key, sdk) in &self.sdks {
            for pattern in &sdk.patterns {
                regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidSdkPattern {
                    key: key.clone(),
                    pattern: pattern.clone(),
                    source,
                })?;
            }
        }
        if let Some(out_file) = &self.out_file {
            let cwd = std::env::current_dir()
                .map_err(|source| ConfigError::Io { path: PathBuf::from("."), source })?;
            ensure_within(&cwd, out_file)?;
        }
        Ok(())
    }

    /// Per-file size cap in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        (self.max_file_size_mb * 1024.0 * 1024.0) as u64
    }

    /// Path of the ignore file under the scan root
    pub fn ignore_file(root: &Path) -> PathBuf {
        root.join(IGNORE_BASENAME)
    }
}

/// Reject output paths that resolve outside `base`
pub fn ensure_within(base: &Path, candidate: &Path) -> Result<(), ConfigError> {
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf().clean()
    } else {
        base.join(candidate).clean()
    };
    if resolved.starts_with(base.clean()) {
        Ok(())
    } else {
        Err(ConfigError::OutFileEscapes(candidate.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig::load(dir.path()).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.max_file_size_mb, DEFAULT_MAX_FILE_SIZE_MB);
    }

    #[test]
    fn test_full_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_BASENAME),
            r#"
version: 1
output: yaml
languages: [python, javascript]
ignore:
  - "tests/**"
  - "vendor/**"
env:
  STRIPE_API_BASE: https://stripe.local
sdks:
  acme:
    package: acme-sdk
    provider: acme
    patterns:
      - 'AcmeClient\('
min_confidence: medium
max_file_size_mb: 2.5
"#,
        )
        .unwrap();

        let config = ScanConfig::load(dir.path()).unwrap();
        assert_eq!(config.output, OutputFormat::Yaml);
        assert_eq!(config.languages, vec!["python", "javascript"]);
        assert_eq!(config.ignore.len(), 2);
        assert_eq!(config.env["STRIPE_API_BASE"], "https://stripe.local");
        assert_eq!(config.sdks["acme"].provider, "acme");
        assert_eq!(config.min_confidence, Confidence::Medium);
        assert_eq!(config.max_file_size_bytes(), (2.5 * 1024.0 * 1024.0) as u64);
    }

    #[test]
    fn test_unknown_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_BASENAME), "no_such_key: true\n").unwrap();
        assert!(matches!(ScanConfig::load(dir.path()), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_nonpositive_max_file_size_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_BASENAME), "max_file_size_mb: 0\n").unwrap();
        assert!(matches!(
            ScanConfig::load(dir.path()),
            Err(ConfigError::InvalidMaxFileSize(_))
        ));
    }

    #[test]
    fn test_bad_sdk_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_BASENAME),
            "sdks:\n  x:\n    package: p\n    provider: v\n    patterns: ['(']\n",
        )
        .unwrap();
        assert!(matches!(
            ScanConfig::load(dir.path()),
            Err(ConfigError::InvalidSdkPattern { .. })
        ));
    }

    #[test]
    fn test_ensure_within() {
        let base = Path::new("/work/project");
        assert!(ensure_within(base, Path::new("out/manifest.json")).is_ok());
        assert!(ensure_within(base, Path::new("manifest.json")).is_ok());
        assert!(ensure_within(base, Path::new("../elsewhere.json")).is_err());
        assert!(ensure_within(base, Path::new("/etc/passwd")).is_err());
        assert!(ensure_within(base, Path::new("out/../../escape.json")).is_err());
    }
}
