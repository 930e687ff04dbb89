//! Language plugin protocol
//!
//! A plugin is the authority for one language/ecosystem: which source
//! extensions it analyzes, which manifest and lockfile basenames it parses,
//! and how findings are extracted from each. The orchestrator treats
//! plugins as interchangeable capability providers; dispatch is by file
//! extension for `analyze` and by basename for `analyze_manifests`.
//!
//! Plugins must be pure functions of their inputs and must not touch the
//! network.

pub(crate) mod patterns;

mod go;
mod java;
mod javascript;
mod php;
mod python;
mod ruby;
mod rust_lang;

pub use patterns::CompiledSdk;

use std::path::{Path, PathBuf};

use crate::config::CustomSdk;
use crate::envmap::EnvMap;
use crate::types::Finding;

/// Inputs handed to a plugin for a single source file
pub struct AnalyzeContext<'a> {
    /// Path relative to the scan root
    pub file_path: &'a str,
    pub source_text: &'a str,
    pub scan_root: &'a Path,
    /// Merged env map for `${VAR}` substitution and host resolution
    pub env: &'a EnvMap,
    /// User-supplied SDK mappings, compiled once per scan
    pub custom_sdks: &'a [CompiledSdk],
}

/// Capability contract implemented by each language plugin
pub trait LanguagePlugin: Send + Sync {
    /// Language tag (`python`, `javascript`, …)
    fn language(&self) -> &'static str;

    /// Source extensions dispatched to [`LanguagePlugin::analyze`]
    fn extensions(&self) -> &'static [&'static str];

    /// Manifest basenames this plugin parses
    fn manifest_basenames(&self) -> &'static [&'static str];

    /// Lockfile basenames this plugin parses (subset of manifest matching)
    fn lockfile_basenames(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `basename` is a manifest or lockfile this plugin owns
    fn matches_manifest(&self, basename: &str) -> bool {
        self.manifest_basenames().contains(&basename)
            || self.lockfile_basenames().contains(&basename)
    }

    /// Pattern-match one source file into findings
    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding>;

    /// Parse the given manifest/lockfile paths into package findings
    ///
    /// Malformed files are a non-fatal scan error: implementations log and
    /// return what they could parse.
    fn analyze_manifests(&self, _paths: &[PathBuf], _scan_root: &Path) -> Vec<Finding> {
        Vec::new()
    }
}

/// The composed plugin set a scan runs with
pub struct PluginSet {
    plugins: Vec<Box<dyn LanguagePlugin>>,
}

impl PluginSet {
    /// All built-in plugins
    pub fn builtin() -> Self {
        Self {
            plugins: vec![
                Box::new(javascript::JavaScriptPlugin),
                Box::new(python::PythonPlugin),
                Box::new(rust_lang::RustPlugin),
                Box::new(go::GoPlugin),
                Box::new(java::JavaPlugin),
                Box::new(ruby::RubyPlugin),
                Box::new(php::PhpPlugin),
            ],
        }
    }

    /// Restrict to the given language tags (empty list keeps everything)
    pub fn restrict(mut self, languages: &[String]) -> Self {
        if !languages.is_empty() {
            self.plugins
                .retain(|p| languages.iter().any(|l| l == p.language()));
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn LanguagePlugin> {
        self.plugins.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin responsible for a source extension, if any
    pub fn for_extension(&self, ext: &str) -> Option<&dyn LanguagePlugin> {
        let ext = ext.to_lowercase();
        self.iter().find(|p| p.extensions().contains(&ext.as_str()))
    }

    /// Whether any plugin registers this source extension
    pub fn has_extension(&self, ext: &str) -> bool {
        self.for_extension(ext).is_some()
    }

    /// Whether any plugin claims this basename as a manifest or lockfile
    pub fn is_manifest_basename(&self, basename: &str) -> bool {
        self.iter().any(|p| p.matches_manifest(basename))
    }

    /// Compile user-supplied SDK mappings for use in [`AnalyzeContext`]
    pub fn compile_custom_sdks(
        sdks: &std::collections::BTreeMap<String, CustomSdk>,
    ) -> Vec<CompiledSdk> {
        sdks.values().filter_map(CompiledSdk::compile).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set_covers_expected_languages() {
        let set = PluginSet::builtin();
        let mut langs: Vec<&str> = set.iter().map(|p| p.language()).collect();
        langs.sort_unstable();
        assert_eq!(
            langs,
            vec!["go", "java", "javascript", "php", "python", "ruby", "rust"]
        );
    }

    #[test]
    fn test_extension_dispatch() {
        let set = PluginSet::builtin();
        assert_eq!(set.for_extension("py").unwrap().language(), "python");
        assert_eq!(set.for_extension("tsx").unwrap().language(), "javascript");
        assert_eq!(set.for_extension("RS").unwrap().language(), "rust");
        assert!(set.for_extension("zig").is_none());
    }

    #[test]
    fn test_manifest_basename_dispatch() {
        let set = PluginSet::builtin();
        assert!(set.is_manifest_basename("package.json"));
        assert!(set.is_manifest_basename("package-lock.json"));
        assert!(set.is_manifest_basename("requirements.txt"));
        assert!(set.is_manifest_basename("requirements-dev.txt"));
        assert!(set.is_manifest_basename("Cargo.lock"));
        assert!(set.is_manifest_basename("composer.lock"));
        assert!(!set.is_manifest_basename("README.md"));
    }

    #[test]
    fn test_restrict() {
        let set = PluginSet::builtin().restrict(&["python".to_owned()]);
        assert_eq!(set.len(), 1);
        assert!(set.is_manifest_basename("pyproject.toml"));
        assert!(!set.is_manifest_basename("package.json"));

        let unrestricted = PluginSet::builtin().restrict(&[]);
        assert_eq!(unrestricted.len(), 7);
    }
}
