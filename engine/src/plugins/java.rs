//! Java/Kotlin analyzer and Maven/Gradle manifest parsing
//!
//! Infrastructure detection follows the JVM conventions: JDBC URLs are
//! sub-typed by dialect prefix, and Kafka brokers are located by scanning
//! back from the producer/consumer construction to the nearest
//! `bootstrap.servers` assignment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::plugins::patterns::{
    common_infra_url_patterns, manifest_rel, package_finding, resolve_version_constraint,
    scan_source, CommentSyntax, ConnRef, HttpPattern, InfraKind, InfraPattern, MethodSpec,
    PatternCatalog, SdkCallPattern, SdkImportPattern, WebhookPattern, DEFAULT_RECEIVER_SKIP,
};
use crate::plugins::{AnalyzeContext, LanguagePlugin};
use crate::types::{Confidence, Finding, WebhookDirection};

const ECOSYSTEM: &str = "maven";

/// Gradle configurations that declare shipped dependencies
const GRADLE_CONFIGURATIONS: &[&str] = &["implementation", "api", "compileOnly", "runtimeOnly"];

static GRADLE_DEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?P<conf>[A-Za-z]+)\s*\(?\s*['"](?P<group>[^:'"]+):(?P<artifact>[^:'"]+):(?P<version>[^'"]+)['"]"#,
    )
    .unwrap()
});

pub(crate) struct JavaPlugin;

static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| {
    // JDBC must match before the bare connection-URL table so the dialect
    // prefix is preserved in the connection ref
    let mut infra = vec![
        InfraPattern {
            regex: Regex::new(r#"(?P<url>jdbc:(?P<dialect>\w+):[^\s"']+)"#).unwrap(),
            kind: InfraKind::Dialect,
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(r"new\s+Kafka(?:Producer|Consumer)\b|KafkaTemplate").unwrap(),
            kind: InfraKind::Fixed("kafka"),
            conn: ConnRef::BootstrapLookback,
        },
        InfraPattern {
            regex: Regex::new(r#"System\.getenv\(\s*"(?P<var>[A-Z][A-Z0-9_]*)"\s*\)"#).unwrap(),
            kind: InfraKind::FromVarName,
            conn: ConnRef::EnvVar,
        },
    ];
    infra.extend(common_infra_url_patterns());

    PatternCatalog {
        comments: CommentSyntax { line: &["//"], block: Some(("/*", "*/")) },
        imports: vec![
            SdkImportPattern {
                regex: Regex::new(r"import\s+software\.amazon\.awssdk\.services\.(?P<service>\w+)")
                    .unwrap(),
                provider: "aws",
                sdk_package: "aws-sdk-java-v2",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"import\s+com\.amazonaws\.services\.(?P<service>\w+)").unwrap(),
                provider: "aws",
                sdk_package: "aws-java-sdk",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"import\s+com\.stripe\.").unwrap(),
                provider: "stripe",
                sdk_package: "stripe-java",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"import\s+com\.twilio\.").unwrap(),
                provider: "twilio",
                sdk_package: "twilio-java",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"import\s+com\.sendgrid\.").unwrap(),
                provider: "sendgrid",
                sdk_package: "sendgrid-java",
                service: None,
            },
            SdkImportPattern {
                regex: Regex::new(r"import\s+com\.slack\.api").unwrap(),
                provider: "slack",
                sdk_package: "slack-api-client",
                service: None,
            },
        ],
        sdk_calls: vec![SdkCallPattern {
            regex: Regex::new(
                r"(?P<service>S3|Sqs|Sns|DynamoDb|Lambda|Kinesis|Ses)(?:Async)?Client\.(?:builder|create)\(",
            )
            .unwrap(),
            provider: "aws",
            sdk_package: "aws-sdk-java-v2",
            service: None,
            has_method_capture: false,
        }],
        http: vec![
            HttpPattern {
                regex: Regex::new(r#"\.getFor(?:Object|Entity)\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Fixed("GET"),
            },
            HttpPattern {
                regex: Regex::new(r#"\.postFor(?:Object|Entity|Location)\(\s*"(?P<url>[^"]+)""#)
                    .unwrap(),
                method: MethodSpec::Fixed("POST"),
            },
            HttpPattern {
                regex: Regex::new(r#"URI\.create\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Unknown,
            },
            HttpPattern {
                regex: Regex::new(r#"\.url\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Unknown,
            },
            HttpPattern {
                regex: Regex::new(r#"new\s+URL\(\s*"(?P<url>[^"]+)""#).unwrap(),
                method: MethodSpec::Unknown,
            },
        ],
        infra,
        webhooks: vec![
            WebhookPattern {
                regex: Regex::new(
                    r#"@(?:Post|Put|Request)Mapping\([^)]*"(?P<url>/[^"]*(?:webhook|hook|callback)[^"]*)""#,
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

impl LanguagePlugin for JavaPlugin {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java", "kt"]
    }

    fn manifest_basenames(&self) -> &'static [&'static str] {
        &["pom.xml", "build.gradle", "build.gradle.kts"]
    }

    fn analyze(&self, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
        scan_source(&CATALOG, ctx)
    }

    fn analyze_manifests(&self, paths: &[PathBuf], scan_root: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in paths {
            let rel = manifest_rel(path, scan_root);
            let parsed = match path.file_name().and_then(|n| n.to_str()) {
                Some("pom.xml") => parse_pom(path, &rel),
                Some("build.gradle" | "build.gradle.kts") => parse_gradle(path, &rel),
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

#[derive(Default)]
struct PomDependency {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    scope: Option<String>,
}

fn parse_pom(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut findings = Vec::new();
    let mut in_dependency = false;
    let mut in_dep_mgmt = false;
    let mut current = PomDependency::default();
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event().with_context(|| format!("parsing {rel}"))? {
            Event::Start(e) => match e.name().as_ref() {
                b"dependencyManagement" => in_dep_mgmt = true,
                b"dependency" if !in_dep_mgmt => {
                    in_dependency = true;
                    current = PomDependency::default();
                },
                b"groupId" if in_dependency => field = Some("group"),
                b"artifactId" if in_dependency => field = Some("artifact"),
                b"version" if in_dependency => field = Some("version"),
                b"scope" if in_dependency => field = Some("scope"),
                _ => field = None,
            },
            Event::Text(e) => {
                if let Some(name) = field {
                    let value = e.unescape().unwrap_or_default().into_owned();
                    match name {
                        "group" => current.group_id = Some(value),
                        "artifact" => current.artifact_id = Some(value),
                        "version" => current.version = Some(value),
                        "scope" => current.scope = Some(value),
                        _ => {},
                    }
                }
            },
            Event::End(e) => match e.name().as_ref() {
                b"dependencyManagement" => in_dep_mgmt = false,
                b"dependency" if in_dependency => {
                    in_dependency = false;
                    field = None;
                    // test and provided scopes are not shipped dependencies
                    if matches!(current.scope.as_deref(), Some("test" | "provided")) {
                        continue;
                    }
                    let (Some(group), Some(artifact)) =
                        (current.group_id.take(), current.artifact_id.take())
                    else {
                        continue;
                    };
                    let constraint = current.version.take();
                    let (version, confidence) = match &constraint {
                        Some(constraint) => resolve_version_constraint(constraint),
                        None => ("unknown".to_owned(), Confidence::Medium),
                    };
                    findings.push(package_finding(
                        format!("{group}:{artifact}"),
                        ECOSYSTEM,
                        version,
                        constraint,
                        rel,
                        confidence,
                    ));
                },
                _ => field = None,
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(findings)
}

fn parse_gradle(path: &Path, rel: &str) -> Result<Vec<Finding>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {rel}"))?;
    let mut findings = Vec::new();

    for line in text.lines() {
        let Some(caps) = GRADLE_DEP_RE.captures(line) else {
            continue;
        };
        if !GRADLE_CONFIGURATIONS.contains(&&caps["conf"]) {
            continue;
        }
        let constraint = caps["version"].to_owned();
        let (version, confidence) = resolve_version_constraint(&constraint);
        findings.push(package_finding(
            format!("{}:{}", &caps["group"], &caps["artifact"]),
            ECOSYSTEM,
            version,
            Some(constraint),
            rel,
            confidence,
        ));
    }
    Ok(findings)
}
