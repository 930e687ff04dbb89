//! PHP analyzer and Composer manifest parsing

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

const ECOSYSTEM: &str = "composer";

pub(crate) struct PhpPlugin;

static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| {
    // PDO DSNs carry their dialect prefix, match them before bare URLs
    let mut infra = vec![
        InfraPattern {
            regex: Regex::new(
                r#"new\s+PDO\(\s*['"](?P<url>(?P<dialect>pgsql|mysql|sqlite|sqlsrv):[^'"]+)"#,
            )
            .unwrap(),
            kind: InfraKind::Dialect,
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(r#"new\s+Predis\\Client\(\s*['"](?P<url>[^'"]+)"#).unwrap(),
            kind: InfraKind::Fixed("redis"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(r#"getenv\(\s*['"](?P<var>[A-Z][A-Z0-9_]*)['"]"#).unwrap(),
            kind: InfraKind::FromVarName,
            conn: ConnRef::EnvVar,
        },
        InfraPattern {
            regex: Regex::new(r#"\$_ENV\[['"](?P<var>[A-Z][A-Z0-9_]*)['"]\]"#).unwrap(),
            kind: InfraKind::FromVarName,
            conn: ConnRef::EnvVar,
        },
    ];
    infra.extend(common_infra_url_patterns());

    PatternCatalog {
        comments: CommentSyntax { line: &["//", "#"], block: Some(("/*", "*/")) },
        imports: vec![
            SdkImportPattern {
                regex: Regex::new(r"use\s+Stripe\\").unwrap(),
                provider: "stripe",
                sdk_package: "stripe/stripe-php",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"use\s+Aws\\(?P<service>\w+)\\").unwrap(),
                provider: "aws",
                sdk_package: "aws/aws-sdk-php",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"use\s+Twilio\\").unwrap(),
                provider: "twilio",
                sdk_package: "twilio/sdk",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"use\s+SendGrid\\").unwrap(),
                provider: "sendgrid",
                sdk_package: "sendgrid/sendgrid",
                service: None,
            },
        ],
        sdk_calls: vec![SdkCallPattern {
            regex: Regex::new(r"new\s+(?P<service>S3|Sqs|Sns|DynamoDb|Lambda)Client\(").unwrap(),
            provider: "aws",
            sdk_package: "aws/aws-sdk-php",
            service: None,
            has_method_capture: false,
        }],
        http: vec![
            HttpPattern {
                regex: Regex::new(
                    r#"\$(?P<recv>\w+)->(?P<method>get|post|put|delete|patch)\(\s*['"](?P<url>[^'"]+)"#,
                )
                .unwrap(),
                method: MethodSpec::FromCapture,
            },
            HttpPattern {
                regex: Regex::new(
                    r#"curl_setopt\([^,]+,\s*CURLOPT_URL,\s*['"](?P<url>[^'"]+)"#,
                )
                .unwrap(),
                method: MethodSpec::Unknown,
            },
            // Only http(s) targets count; php:// and file paths are dropped
            HttpPattern {
                regex: Regex::new(r#"file_get_contents\(\s*['"](?P<url>https?://[^'"]+)"#).unwrap(),
                method: MethodSpec::Unknown,
            },
        ],
        infra,
        webhooks: vec![
            WebhookPattern {
                regex: Regex::new(
                    r#"Route::(?:post|put)\(\s*['"](?P<url>/[^'"]*(?:webhook|hook|callback)[^'"]*)"#,
                )
                .unwrap(),
                direction: WebhookDirection::InboundCallback,
                provider: None,
            },
            WebhookPattern {
                regex: Regex::new(
                    r#"(?i)webhook[_-]?url['"]?\s*(?:=>|=|:)\s*['"](?P<url>[^'"]+)"#,
                )
                .unwrap(),
                direction: WebhookDirection::OutboundRegistration,
                provider: None,
            },
        ],
        receiver_skip: DEFAULT_RECEIVER_SKIP,
    }
});

impl LanguagePlugin for PhpPlugin {
    fn language(&self) -> &'static str {
        "php"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn manifest_basenames(&self) -> &'static [&'static str] {
        &["composer.json"]
    }

    fn lockfile_basenames(&self) -> &'static [&'static str] {
        &["composer.lock"]
    }

    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
        scan_source(&CATALOG, ctx)
    }

    fn analyze_manifests(&self, paths: &[PathBuf], scan_root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in paths {
            let rel = manifest_rel(path, scan_root);
            let parsed = match path.file_name().and_then(|n| n.to_str()) {
                Some("composer.json") => parse_composer_json(path, &rel),
                Some("composer.lock") => parse_composer_lock(path, &rel),
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

/// Platform pseudo-packages declared alongside real dependencies
fn is_platform_package(name: &str) -> bool {
    name == "php" || name.starts_with("ext-") || name.starts_with("lib-")
}

fn parse_composer_json(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let doc: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {rel}"))?;
    let mut findings = Vec::new();

    // require-dev is explicitly development-only
    if let Some(require) = doc.get("require").and_then(|r| r.as_object()) {
        for (name, constraint) in require {
            if is_platform_package(name) {
                continue;
            }
            let Some(constraint) = constraint.as_str() else {
                continue;
            };
            let (version, confidence) = resolve_version_constraint(constraint);
            findings.push(package_finding(
                name,
                ECOSYSTEM,
                version,
                Some(constraint.to_owned()),
                rel,
                confidence,
            ));
        }
    }
    Ok(findings)
}

fn parse_composer_lock(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let doc: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {rel}"))?;
    let mut findings = Vec::new();

    // "packages-dev" is skipped
    if let Some(packages) = doc.get("packages").and_then(|p| p.as_array()) {
        for package in packages {
            let (Some(name), Some(version)) = (
                package.get("name").and_then(|n| n.as_str()),
                package.get("version").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            findings.push(package_finding(
                name,
                ECOSYSTEM,
                version.trim_start_matches('v'),
                None,
                rel,
                Confidence::High,
            ));
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envmap::EnvMap;
    use crate::types::FindingKind;
    use std::fs;

    fn analyze_str(source: &str) -> Vec<Finding> {
        let env = EnvMap::from_vars(Default::default());
        let ctx = AnalyzeContext {
            file_path: "src/Billing.php",
            source_text: source,
            scan_root: Path::new("/repo"),
            env: &env,
            custom_sdks: &[],
        };
        PhpPlugin.analyze(&ctx)
    }

    #[test]
    fn test_guzzle_call() {
        let findings =
            analyze_str(r#"$response = $client->post("https://api.stripe.com/v1/charges");"#);
        assert!(findings.iter().any(|f| matches!(
            &f.kind,
            FindingKind::Api { url, method, provider, .. }
                if url == "https://api.stripe.com/v1/charges"
                    && method.as_deref() == Some("POST")
                    && provider.as_deref() == Some("stripe")
        )));
    }

    #[test]
    fn test_file_get_contents_non_http_dropped() {
        let findings = analyze_str(r#"$raw = file_get_contents("php://input");"#);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_pdo_dsn_dialect() {
        let findings = analyze_str(r#"$pdo = new PDO("pgsql:host=db.internal;dbname=app");"#);
        assert!(findings.iter().any(|f| matches!(
            &f.kind,
            FindingKind::Infrastructure { kind, connection_ref, .. }
                if kind == "postgresql" && connection_ref.starts_with("pgsql:")
        )));
    }

    #[test]
    fn test_parse_composer_json_skips_platform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");
        fs::write(
            &path,
            r#"{
  "require": {
    "php": ">=8.1",
    "ext-json": "*",
    "stripe/stripe-php": "^13.0",
    "guzzlehttp/guzzle": "^7.8"
  },
  "require-dev": {
    "phpunit/phpunit": "^10.0"
  }
}"#,
        )
        .unwrap();

        let findings = parse_composer_json(&path, "composer.json").unwrap();
        let names: Vec<String> = findings
            .iter()
            .filter_map(|f| match &f.kind {
                FindingKind::Package { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"stripe/stripe-php".to_owned()));
        assert!(names.contains(&"guzzlehttp/guzzle".to_owned()));
    }

    #[test]
    fn test_parse_composer_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.lock");
        fs::write(
            &path,
            r#"{
  "packages": [
    { "name": "stripe/stripe-php", "version": "v13.2.0" }
  ],
  "packages-dev": [
    { "name": "phpunit/phpunit", "version": "10.5.1" }
  ]
}"#,
        )
        .unwrap();

        let findings = parse_composer_lock(&path, "composer.lock").unwrap();
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0].kind,
            FindingKind::Package { name, current_version, .. }
                if name == "stripe/stripe-php" && current_version == "13.2.0"
        ));
    }
}
