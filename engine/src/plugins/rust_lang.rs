//! Rust analyzer and Cargo manifest parsing

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugins::patterns::{
    common_infra_url_patterns, manifest_rel, package_finding, resolve_version_constraint,
    scan_source, CommentSyntax, ConnRef, HttpPattern, InfraKind, InfraPattern, MethodSpec,
    PatternCatalog, SdkCallPattern, SdkImportPattern, WebhookPattern, DEFAULT_RECEIVER_SKIP,
};
use crate::plugins::{AnalyzeContext, LanguagePlugin};
use crate::types::{Confidence, Finding, WebhookDirection};

const ECOSYSTEM: &str = "cargo";

pub(crate) struct RustPlugin;

static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| {
    let mut infra = common_infra_url_patterns();
    infra.push(InfraPattern {
        regex: Regex::new(r#"(?:std::)?env::var\(\s*"(?P<var>[A-Z][A-Z0-9_]*)"\s*\)"#).unwrap(),
        kind: InfraKind::FromVarName,
        conn: ConnRef::EnvVar,
    });

    PatternCatalog {
        comments: CommentSyntax { line: &["//"], block: Some(("/*", "*/")) },
        imports: vec![
            SdkImportPattern {
                regex: Regex::new(r"use\s+aws_sdk_(?P<service>\w+)").unwrap(),
                provider: "aws",
                sdk_package: "aws-sdk-rust",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"use\s+stripe\b").unwrap(),
                provider: "stripe",
                sdk_package: "async-stripe",
                service: None,
            },
        ],
        sdk_calls: vec![SdkCallPattern {
            regex: Regex::new(r"aws_sdk_(?P<service>\w+)::Client::new").unwrap(),
            provider: "aws",
            sdk_package: "aws-sdk-rust",
            service: None,
            has_method_capture: false,
        }],
        http: vec![
            HttpPattern {
                regex: Regex::new(r#"reqwest::(?:blocking::)?get\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Fixed("GET"),
            },
            HttpPattern {
                regex: Regex::new(
                    r#"(?P<recv>\w+)\.(?P<method>get|post|put|delete|patch)\(\s*"(?P<url>[^"]+)""#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
        ],
        infra,
        webhooks: vec![
            WebhookPattern {
                regex: Regex::new(
                    r#"\.route\(\s*"(?P<url>/[^"]*(?:webhook|hook|callback)[^"]*)""#,
                )
                .unwrap(),
                direction: WebhookDirection::InboundCallback,
                provider: None,
            },
            WebhookPattern {
                regex: Regex::new(r#"(?i)webhook[_-]?url\s*[:=]\s*"(?P<url>[^"]+)""#).unwrap(),
                direction: WebhookDirection::OutboundRegistration,
                provider: None,
            },
        ],
        receiver_skip: DEFAULT_RECEIVER_SKIP,
    }
});

impl LanguagePlugin for RustPlugin {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn manifest_basenames(&self) -> &'static [&'static str] {
        &["Cargo.toml"]
    }

    fn lockfile_basenames(&self) -> &'static [&'static str] {
        &["Cargo.lock"]
    }

    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
        scan_source(&CATALOG, ctx)
    }

    fn analyze_manifests(&self, paths: &[PathBuf], scan_root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in paths {
            let rel = manifest_rel(path, scan_root);
            let parsed = match path.file_name().and_then(|n| n.to_str()) {
                Some("Cargo.toml") => parse_cargo_toml(path, &rel),
                Some("Cargo.lock") => parse_cargo_lock(path, &rel),
                _ => continue,
            };
            match parsed {
                Ok(mut batch) => findings.append(&mut batch),
                Err(err) => log::warn!("could not parse {rel}: {err:#}"),
            }
        }
        findings
    }
}

fn parse_cargo_toml(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let doc: toml::Value = text.parse().with_context(|| format!("parsing {rel}"))?;
    let mut findings = Vec::new();

    // dev-dependencies are skipped; build and target tables count
    let mut tables: Vec<&toml::value::Table> = Vec::new();
    for key in ["dependencies", "build-dependencies"] {
        if let Some(table) = doc.get(key).and_then(|d| d.as_table()) {
            tables.push(table);
        }
    }
    if let Some(workspace) = doc.get("workspace") {
        if let Some(table) = workspace.get("dependencies").and_then(|d| d.as_table()) {
            tables.push(table);
        }
    }
    if let Some(targets) = doc.get("target").and_then(|t| t.as_table()) {
        for target in targets.values() {
            if let Some(table) = target.get("dependencies").and_then(|d| d.as_table()) {
                tables.push(table);
            }
        }
    }

    for table in tables {
        for (name, value) in table {
            let constraint = match value {
                toml::Value::String(s) => Some(s.clone()),
                toml::Value::Table(spec) => {
                    if spec.contains_key("path") && !spec.contains_key("version") {
                        continue;
                    }
                    spec.get("version").and_then(|v| v.as_str()).map(str::to_owned)
                },
                _ => None,
            };
            let (version, confidence) = match &constraint {
                Some(constraint) => resolve_version_constraint(constraint),
                None => ("unknown".to_owned(), Confidence::Medium),
            };
            findings.push(package_finding(name, ECOSYSTEM, version, constraint, rel, confidence));
        }
    }
    Ok(findings)
}

fn parse_cargo_lock(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let doc: toml::Value = text.parse().with_context(|| format!("parsing {rel}"))?;
    let mut findings = Vec::new();

    if let Some(packages) = doc.get("package").and_then(|p| p.as_array()) {
        for package in packages {
            // Entries without a source are workspace members, not dependencies
            if package.get("source").is_none() {
                continue;
            }
            let (Some(name), Some(version)) = (
                package.get("name").and_then(|n| n.as_str()),
                package.get("version").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            findings.push(package_finding(name, ECOSYSTEM, version, None, rel, Confidence::High));
        }
    }
    Ok(findings)
}
