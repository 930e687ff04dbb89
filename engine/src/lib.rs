//! Depscope engine - dependency manifest scanning for polyglot codebases
//!
//! This crate provides the core logic for producing a Dependency Manifest:
//! a structured, validated inventory of every external surface a codebase
//! touches, including:
//!
//! - Declared third-party packages, reconciled across manifests and lockfiles
//! - Outbound HTTP endpoints, with `${VAR}` URL templates resolved through a
//!   layered environment map
//! - Vendor SDK usages, deduplicated per provider
//! - Direct infrastructure connections (databases, queues, caches)
//! - Webhook registrations and callbacks
//!
//! Every emitted string passes through a single secret-redaction chokepoint,
//! and the final document is validated against the embedded schema before it
//! leaves the engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use depscope_engine::Scanner;
//!
//! let outcome = Scanner::new("/path/to/repo")?.scan()?;
//! println!("{}", outcome.manifest.to_json()?);
//! ```

pub mod aggregate;
pub mod config;
pub mod envmap;
pub mod manifest;
pub mod plugins;
pub mod reconcile;
pub mod schema;
pub mod scheduler;
pub mod types;
pub mod walker;

pub use config::{ConfigError, CustomSdk, OutputFormat, ScanConfig};
pub use envmap::{redact, EnvMap, UrlResolution};
pub use manifest::{
    ApiEntry, InfrastructureEntry, Manifest, Metadata, PackageEntry, SdkEntry, WebhookEntry,
    MANIFEST_VERSION,
};
pub use plugins::{AnalyzeContext, LanguagePlugin, PluginSet};
pub use schema::{parse, parse_from_string, SchemaError, ValidationIssue, DEFAULT_MAX_PARSE_BYTES};
pub use scheduler::{CancelFlag, ScanError, ScanOutcome, ScanPhase, Scanner};
pub use types::{Confidence, FileError, Finding, FindingKind, Location, WebhookDirection};
pub use walker::{FileWalker, WalkError, WalkResult, WalkedFile};

/// Library version, stamped into manifest metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.chars().any(|c| c.is_ascii_digit()));
    }
}
