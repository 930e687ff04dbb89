//! Go analyzer and go.mod parsing

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugins::patterns::{
    common_infra_url_patterns, manifest_rel, package_finding, scan_source, CommentSyntax,
    ConnRef, HttpPattern, InfraKind, InfraPattern, MethodSpec, PatternCatalog, SdkImportPattern,
    WebhookPattern, DEFAULT_RECEIVER_SKIP,
};
use crate::plugins::{AnalyzeContext, LanguagePlugin};
use crate::types::{Confidence, Finding, WebhookDirection};

const ECOSYSTEM: &str = "go";

pub(crate) struct GoPlugin;

static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| {
    let mut infra = common_infra_url_patterns();
    infra.push(InfraPattern {
        regex: Regex::new(
            r#"sql\.Open\(\s*"(?P<dialect>postgres|mysql|sqlite3|sqlserver)",\s*"(?P<url>[^"]+)""#,
        )
        .unwrap(),
        kind: InfraKind::Dialect,
        conn: ConnRef::Url,
    });
    infra.push(InfraPattern {
        regex: Regex::new(r#"Brokers:\s*\[\]string\{\s*"(?P<url>[^"]+)""#).unwrap(),
        kind: InfraKind::Fixed("kafka"),
        conn: ConnRef::Url,
    });
    infra.push(InfraPattern {
        regex: Regex::new(r#"os\.Getenv\(\s*"(?P<var>[A-Z][A-Z0-9_]*)"\s*\)"#).unwrap(),
        kind: InfraKind::FromVarName,
        conn: ConnRef::EnvVar,
    });

    PatternCatalog {
        comments: CommentSyntax { line: &["//"], block: Some(("/*", "*/")) },
        imports: vec![
            SdkImportPattern {
                regex: Regex::new(
                    r#""github\.com/aws/aws-sdk-go(?:-v2)?/service/(?P<service>[a-z0-9]+)""#,
                )
                .unwrap(),
                provider: "aws",
                sdk_package: "aws-sdk-go",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r#""github\.com/stripe/stripe-go(?:/v\d+)?""#).unwrap(),
                provider: "stripe",
                sdk_package: "stripe-go",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r#""cloud\.google\.com/go/(?P<service>[a-z0-9]+)""#).unwrap(),
                provider: "google",
                sdk_package: "cloud.google.com/go",
                service: None,
            },
        ],
        sdk_calls: Vec::new(),
        http: vec![
            HttpPattern {
                regex: Regex::new(r#"http\.Get\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Fixed("GET"),
            },
            HttpPattern {
                regex: Regex::new(r#"http\.Post\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Fixed("POST"),
            },
            HttpPattern {
                regex: Regex::new(
                    r#"http\.NewRequest(?:WithContext)?\([^,]*,?\s*"(?P<method>GET|POST|PUT|DELETE|PATCH)",\s*"(?P<url>[^"]+)""#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
            HttpPattern {
                regex: Regex::new(
                    r#"http\.NewRequest(?:WithContext)?\([^,]*,?\s*http\.Method(?P<method>Get|Post|Put|Delete|Patch),\s*"(?P<url>[^"]+)""#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
            HttpPattern {
                regex: Regex::new(
                    r#"(?P<recv>\w+)\.(?P<method>Get|Post|Put|Delete|Patch)\(\s*"(?P<url>[^"]+)""#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
        ],
        infra,
        webhooks: vec![
            WebhookPattern {
                regex: Regex::new(
                    r#"HandleFunc\(\s*"(?P<url>/[^"]*(?:webhook|hook|callback)[^"]*)""#,
                )
                .unwrap(),
                direction: WebhookDirection::InboundCallback,
                provider: None,
            },
            WebhookPattern {
                regex: Regex::new(
                    r#"\.(?:POST|PUT|Handle)\(\s*"(?P<url>/[^"]*(?:webhook|hook|callback)[^"]*)""#,
                )
                .unwrap(),
                direction: WebhookDirection::InboundCallback,
                provider: None,
            },
            WebhookPattern {
                regex: Regex::new(r#"(?i)webhookurl\s*[:=]+\s*"(?P<url>[^"]+)""#).unwrap(),
                direction: WebhookDirection::OutboundRegistration,
                provider: None,
            },
        ],
        receiver_skip: DEFAULT_RECEIVER_SKIP,
    }
});

impl LanguagePlugin for GoPlugin {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn manifest_basenames(&self) -> &'static [&'static str] {
        &["go.mod"]
    }

    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
        scan_source(&CATALOG, ctx)
    }

    fn analyze_manifests(&self, paths: &[PathBuf], scan_root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in paths {
            let rel = manifest_rel(path, scan_root);
            if path.file_name().and_then(|n| n.to_str()) != Some("go.mod") {
                continue;
            }
            match parse_go_mod(path, &rel) {
                Ok(mut batch) => findings.append(&mut batch),
                Err(err) => log::warn!("could not parse {rel}: {err:#}"),
            }
        }
        findings
    }
}

fn parse_go_mod(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let mut findings = Vec::new();
    let mut in_require = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.starts_with("require (") {
            in_require = true;
            continue;
        }
        if in_require && line == ")" {
            in_require = false;
            continue;
        }

        let entry = if in_require {
            line
        } else if let Some(rest) = line.strip_prefix("require ") {
            rest
        } else {
            continue;
        };

        // Indirect requirements are transitive, not declared dependencies
        if entry.contains("// indirect") {
            continue;
        }
        let mut parts = entry.split_whitespace();
        let (Some(module), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };
        if !version.starts_with('v') {
            continue;
        }
        findings.push(package_finding(
            module,
            ECOSYSTEM,
            version.trim_start_matches('v'),
            Some(version.to_owned()),
            rel,
            Confidence::High,
        ));
    }
    Ok(findings)
}
