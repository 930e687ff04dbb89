//! Ruby analyzer and Bundler manifest parsing

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

const ECOSYSTEM: &str = "rubygems";

static GEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*gem\s+['"](?P<name>[\w-]+)['"](?:\s*,\s*['"](?P<constraint>[^'"]+)['"])?(?P<rest>.*)$"#)
        .unwrap()
});

static GEMFILE_LOCK_SPEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^    (?P<name>[\w-]+) \((?P<version>[^)]+)\)$").unwrap());

static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*group\s+(?P<groups>.+?)\s+do").unwrap());

pub(crate) struct RubyPlugin;

static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| {
    let mut infra = common_infra_url_patterns();
    infra.push(InfraPattern {
        regex: Regex::new(r#"ENV(?:\.fetch\(|\[)\s*['"](?P<var>[A-Z][A-Z0-9_]*)['"]"#).unwrap(),
        kind: InfraKind::FromVarName,
        conn: ConnRef::EnvVar,
    });

    PatternCatalog {
        comments: CommentSyntax { line: &["#"], block: None },
        imports: vec![
            SdkImportPattern {
                regex: Regex::new(r#"require\s+['"]aws-sdk-(?P<service>\w+)['"]"#).unwrap(),
                provider: "aws",
                sdk_package: "aws-sdk-ruby",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r#"require\s+['"]stripe['"]"#).unwrap(),
                provider: "stripe",
                sdk_package: "stripe-ruby",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r#"require\s+['"]twilio-ruby['"]"#).unwrap(),
                provider: "twilio",
                sdk_package: "twilio-ruby",
                service: None,
            },
        ],
        sdk_calls: vec![SdkCallPattern {
            regex: Regex::new(r"Aws::(?P<service>\w+)::(?:Client|Resource)\.new").unwrap(),
            provider: "aws",
            sdk_package: "aws-sdk-ruby",
            service: None,
            has_method_capture: false,
        }],
        http: vec![
            HttpPattern {
                regex: Regex::new(
                    r#"Net::HTTP\.get(?:_response)?\(\s*URI\(\s*['"](?P<url>[^'"]+)"#,
                )
                .unwrap(),
                method: MethodSpec::Fixed("GET"),
            },
            HttpPattern {
                regex: Regex::new(
                    r#"(?P<recv>\w+)\.(?P<method>get|post|put|delete|patch)\(\s*['"](?P<url>[^'"]+)"#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
        ],
        infra,
        webhooks: vec![
            WebhookPattern {
                regex: Regex::new(
                    r#"^\s*post\s+['"](?P<url>/[^'"]*(?:webhook|hook|callback)[^'"]*)['"]"#,
                )
                .unwrap(),
                direction: WebhookDirection::InboundCallback,
                provider: None,
            },
            WebhookPattern {
                regex: Regex::new(r#"(?i)webhook[_-]?url\s*[:=]+\s*['"](?P<url>[^'"]+)"#).unwrap(),
                direction: WebhookDirection::OutboundRegistration,
                provider: None,
            },
        ],
        receiver_skip: DEFAULT_RECEIVER_SKIP,
    }
});

impl LanguagePlugin for RubyPlugin {
    fn language(&self) -> &'static str {
        "ruby"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rb"]
    }

    fn manifest_basenames(&self) -> &'static [&'static str] {
        &["Gemfile"]
    }

    fn lockfile_basenames(&self) -> &'static [&'static str] {
        &["Gemfile.lock"]
    }

    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
        scan_source(&CATALOG, ctx)
    }

    fn analyze_manifests(&self, paths: &[PathBuf], scan_root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in paths {
            let rel = manifest_rel(path, scan_root);
            let parsed = match path.file_name().and_then(|n| n.to_str()) {
                Some("Gemfile") => parse_gemfile(path, &rel),
                Some("Gemfile.lock") => parse_gemfile_lock(path, &rel),
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

fn parse_gemfile(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let mut findings = Vec::new();
    // Depth of nested `group … do` blocks that are dev/test-only
    let mut skip_depth = 0usize;
    let mut block_depth = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(caps) = GROUP_RE.captures(trimmed) {
            block_depth += 1;
            if skip_depth == 0 && is_dev_group(&caps["groups"]) {
                skip_depth = block_depth;
            }
            continue;
        }
        if trimmed.ends_with(" do") || trimmed == "do" {
            block_depth += 1;
            continue;
        }
        if trimmed == "end" {
            if skip_depth == block_depth {
                skip_depth = 0;
            }
            block_depth = block_depth.saturating_sub(1);
            continue;
        }
        if skip_depth != 0 {
            continue;
        }
        let Some(caps) = GEM_RE.captures(line) else {
            continue;
        };
        if caps["rest"].contains(":test") || caps["rest"].contains(":development") {
            continue;
        }
        let constraint = caps.name("constraint").map(|m| m.as_str().to_owned());
        let (version, confidence) = match &constraint {
            Some(constraint) => {
                // Bundler's pessimistic operator pins the base version
                let cleaned = constraint.trim_start_matches("~>").trim();
                resolve_version_constraint(cleaned)
            },
            None => ("unknown".to_owned(), Confidence::Medium),
        };
        findings.push(package_finding(&caps["name"], ECOSYSTEM, version, constraint, rel, confidence));
    }
    Ok(findings)
}

fn is_dev_group(groups: &str) -> bool {
    let named: Vec<&str> = groups
        .split(',')
        .map(|g| g.trim().trim_start_matches(':'))
        .collect();
    named.iter().all(|g| matches!(*g, "development" | "test"))
}

/// Parse the resolved gems in the `specs:` section (four-space indent)
fn parse_gemfile_lock(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let mut findings = Vec::new();
    let mut in_specs = false;

    for line in text.lines() {
        if line.trim_end() == "GEM" {
            continue;
        }
        if line.trim() == "specs:" {
            in_specs = true;
            continue;
        }
        if in_specs && !line.starts_with("    ") {
            in_specs = false;
        }
        if !in_specs {
            continue;
        }
        if let Some(caps) = GEMFILE_LOCK_SPEC_RE.captures(line) {
            findings.push(package_finding(
                &caps["name"],
                ECOSYSTEM,
                &caps["version"],
                None,
                rel,
                Confidence::High,
            ));
        }
    }
    Ok(findings)
}
