//! File discovery under the scan root
//!
//! Enumerates regular files, applying in order: the always-on default
//! excludes (dotfiles plus the usual build/vendor directories), the
//! project's `.depscopeignore` (gitignore semantics), config-level ignore
//! patterns, and per-invocation extras. Oversized files are counted as
//! skipped without being read. Symlinks are not followed.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use thiserror::Error;

use crate::config::ScanConfig;
use crate::plugins::PluginSet;

/// Directories excluded from every walk
pub const DEFAULT_EXCLUDED_DIRS: &[&str] =
    &["node_modules", ".git", "dist", "build", ".next", "coverage"];

/// A file surviving the filters, ready for dispatch
#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, forward-slashed
    pub relative_path: String,
    pub size_bytes: u64,
}

/// Outcome of a walk, partitioned for the scheduler
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Files whose basename a plugin claims as manifest or lockfile
    pub manifest_files: Vec<WalkedFile>,
    /// Files whose extension a plugin registers
    pub source_files: Vec<WalkedFile>,
    /// Oversized files, counted without being read
    pub skipped: u32,
}

/// Walk failures, all fatal
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("scan root {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("could not build ignore matcher: {0}")]
    Matcher(#[source] ignore::Error),
}

pub struct FileWalker {
    root: PathBuf,
    max_file_size: u64,
    matcher: Gitignore,
}

impl FileWalker {
    /// Build a walker for one root
    ///
    /// Pattern sources are added in precedence order (ignore file, config,
    /// extras) so later sources can re-include with `!` the gitignore way.
    pub fn new(
        root: &Path,
        config: &ScanConfig,
        extra_patterns: &[String],
    ) -> Result<Self, WalkError> {
        if !root.is_dir() {
            return Err(WalkError::InvalidRoot(root.to_path_buf()));
        }

        let mut builder = GitignoreBuilder::new(root);
        let ignore_file = ScanConfig::ignore_file(root);
        if ignore_file.is_file() {
            if let Some(err) = builder.add(&ignore_file) {
                log::warn!("skipping unreadable {}: {err}", ignore_file.display());
            }
        }
        for pattern in config.ignore.iter().chain(extra_patterns) {
            builder
                .add_line(None, pattern)
                .map_err(|source| WalkError::Pattern { pattern: pattern.clone(), source })?;
        }
        let matcher = builder.build().map_err(WalkError::Matcher)?;

        Ok(Self {
            root: root.to_path_buf(),
            max_file_size: config.max_file_size_bytes(),
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate and partition files for the given plugin set
    pub fn walk(&self, plugins: &PluginSet) -> WalkResult {
        let mut result = WalkResult::default();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map_or(true, |name| !DEFAULT_EXCLUDED_DIRS.contains(&name))
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("walk error: {err}");
                    continue;
                },
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if self
                .matcher
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
            {
                continue;
            }

            let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let is_manifest = plugins.is_manifest_basename(basename);
            let is_source = !is_manifest
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| plugins.has_extension(ext));
            if !is_manifest && !is_source {
                continue;
            }

            let size_bytes = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    log::warn!("could not stat {}: {err}", path.display());
                    result.skipped += 1;
                    continue;
                },
            };
            if size_bytes > self.max_file_size {
                log::debug!("skipping oversized {} ({size_bytes} bytes)", path.display());
                result.skipped += 1;
                continue;
            }

            let walked = WalkedFile {
                path: path.to_path_buf(),
                relative_path: relative.to_string_lossy().replace('\\', "/"),
                size_bytes,
            };
            if is_manifest {
                result.manifest_files.push(walked);
            } else {
                result.source_files.push(walked);
            }
        }

        result
            .manifest_files
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        result
            .source_files
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn walk_with_config(root: &Path, config: &ScanConfig) -> WalkResult {
        FileWalker::new(root, config, &[])
            .unwrap()
            .walk(&PluginSet::builtin())
    }

    fn walk(root: &Path) -> WalkResult {
        walk_with_config(root, &ScanConfig::default())
    }

    fn rel_names(files: &[WalkedFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn test_partition_manifest_vs_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("src/app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("README.md"), "hi").unwrap();

        let result = walk(dir.path());
        assert_eq!(rel_names(&result.manifest_files), vec!["package.json"]);
        assert_eq!(rel_names(&result.source_files), vec!["src/app.py"]);
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_default_dirs_and_dotfiles_excluded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/index.js"), "x").unwrap();
        fs::create_dir(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/bundle.js"), "x").unwrap();
        fs::write(dir.path().join(".hidden.py"), "x").unwrap();
        fs::write(dir.path().join("kept.js"), "x").unwrap();

        let result = walk(dir.path());
        assert_eq!(rel_names(&result.source_files), vec!["kept.js"]);
    }

    #[test]
    fn test_config_ignore_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        fs::write(dir.path().join("src/app.py"), "x").unwrap();
        fs::write(dir.path().join("tests/app.py"), "x").unwrap();

        let config = ScanConfig { ignore: vec!["tests/**".to_owned()], ..Default::default() };
        let result = walk_with_config(dir.path(), &config);
        assert_eq!(rel_names(&result.source_files), vec!["src/app.py"]);
    }

    #[test]
    fn test_ignore_file_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/lib.rb"), "x").unwrap();
        fs::write(dir.path().join("main.rb"), "x").unwrap();
        fs::write(dir.path().join(".depscopeignore"), "vendor/\n").unwrap();

        let result = walk(dir.path());
        assert_eq!(rel_names(&result.source_files), vec!["main.rb"]);
    }

    #[test]
    fn test_size_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let cap = ScanConfig::default().max_file_size_bytes() as usize;
        fs::write(dir.path().join("exact.js"), vec![b'x'; cap]).unwrap();
        fs::write(dir.path().join("over.js"), vec![b'x'; cap + 1]).unwrap();

        let result = walk(dir.path());
        assert_eq!(rel_names(&result.source_files), vec!["exact.js"]);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_invalid_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            FileWalker::new(&missing, &ScanConfig::default(), &[]),
            Err(WalkError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_bad_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig { ignore: vec!["[".to_owned()], ..Default::default() };
        assert!(matches!(
            FileWalker::new(dir.path(), &config, &[]),
            Err(WalkError::Pattern { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.py"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.py"), dir.path().join("link.py"))
            .unwrap();

        let result = walk(dir.path());
        assert_eq!(rel_names(&result.source_files), vec!["real.py"]);
    }
}
