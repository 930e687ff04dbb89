//! Pattern catalogues and the shared line-scanning engine
//!
//! Every language plugin describes its detection surface as a
//! [`PatternCatalog`]: regex tables for HTTP calls, SDK imports and
//! constructors, infrastructure clients, and webhook idioms, plus the
//! language's comment syntax. [`scan_source`] is the single engine that
//! walks a file against a catalogue, so comment handling, per-provider SDK
//! deduplication, env resolution, and per-line duplicate suppression behave
//! identically across languages.
//!
//! Catalogues are `Lazy` statics compiled once per process and shared by
//! reference across workers.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::config::CustomSdk;
use crate::envmap::redact;
use crate::plugins::AnalyzeContext;
use crate::types::{Confidence, Finding, FindingKind, Location, WebhookDirection};

/// How far back the Kafka broker look-back scans
const KAFKA_LOOKBACK_LINES: usize = 15;

/// Receiver names that never count as HTTP clients
pub(crate) const DEFAULT_RECEIVER_SKIP: &[&str] =
    &["os", "self", "this", "response", "res", "req", "request", "logger", "console"];

/// Hosts whose provider is known well enough to tag API findings
const PROVIDER_HOSTS: &[(&str, &str)] = &[
    ("api.stripe.com", "stripe"),
    ("api.github.com", "github"),
    ("slack.com", "slack"),
    ("hooks.slack.com", "slack"),
    ("api.twilio.com", "twilio"),
    ("api.sendgrid.com", "sendgrid"),
    ("api.openai.com", "openai"),
    ("api.paypal.com", "paypal"),
];

/// Comment syntax for one language
pub(crate) struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: Option<(&'static str, &'static str)>,
}

/// Where an HTTP pattern's method comes from
pub(crate) enum MethodSpec {
    /// Every match uses this verb
    Fixed(&'static str),
    /// The verb is in the `method` capture group
    FromCapture,
    /// The idiom does not reveal a verb
    Unknown,
}

/// One HTTP call idiom; the URL is in the `url` capture group, an optional
/// receiver name in `recv`
pub(crate) struct HttpPattern {
    pub regex: Regex,
    pub method: MethodSpec,
}

/// One import idiom that pins a vendor SDK
///
/// When the regex has a `service` capture group (per-service client
/// packages), the captured name wins over the fixed `service`.
pub(crate) struct SdkImportPattern {
    pub regex: Regex,
    pub provider: &'static str,
    pub sdk_package: &'static str,
    /// Service implied by the import itself (e.g. an S3-only client package)
    pub service: Option<&'static str>,
}

/// One constructor/call idiom that enriches an SDK finding
pub(crate) struct SdkCallPattern {
    pub regex: Regex,
    pub provider: &'static str,
    pub sdk_package: &'static str,
    pub service: Option<&'static str>,
    /// API method recorded from the `method` capture group when present
    pub has_method_capture: bool,
}

/// What an infrastructure pattern uses as its connection reference
pub(crate) enum ConnRef {
    /// A literal connection URL in the `url` capture group
    Url,
    /// An env-var name in the `var` capture group
    EnvVar,
    /// Kafka convention: scan back for a `bootstrap.servers` assignment
    BootstrapLookback,
}

/// How an infrastructure pattern names its type
pub(crate) enum InfraKind {
    Fixed(&'static str),
    /// Connection URLs are sub-typed by the dialect in the `dialect` capture
    /// group (`jdbc:postgresql:` → `postgresql`, PDO `pgsql:` → `postgresql`)
    Dialect,
    /// The type is inferred from keywords in the captured env-var name
    FromVarName,
}

/// Map a driver/dialect token to the canonical infrastructure type
pub(crate) fn normalize_dialect(dialect: &str) -> String {
    match dialect.to_lowercase().as_str() {
        "postgres" | "postgresql" | "pgsql" | "pg" => "postgresql".to_owned(),
        "mysql" | "mariadb" => "mysql".to_owned(),
        "sqlite" | "sqlite3" => "sqlite".to_owned(),
        "sqlserver" | "sqlsrv" | "mssql" => "sqlserver".to_owned(),
        "mongodb" | "mongodb+srv" => "mongodb".to_owned(),
        other => other.to_owned(),
    }
}

/// Infer an infrastructure type from an env-var name
pub(crate) fn infra_kind_for_var(var: &str) -> Option<&'static str> {
    let upper = var.to_uppercase();
    let segments: Vec<&str> = upper.split('_').collect();
    if upper.contains("POSTGRES") || segments.contains(&"PG") {
        return Some("postgresql");
    }
    if upper.contains("MYSQL") {
        return Some("mysql");
    }
    if upper.contains("MONGO") {
        return Some("mongodb");
    }
    if upper.contains("REDIS") {
        return Some("redis");
    }
    if upper.contains("ELASTIC") {
        return Some("elasticsearch");
    }
    if upper.contains("KAFKA") {
        return Some("kafka");
    }
    if upper.contains("RABBIT") || upper.contains("AMQP") {
        return Some("rabbitmq");
    }
    if upper.contains("DYNAMO") {
        return Some("dynamodb");
    }
    if upper.contains("MEMCACHE") {
        return Some("memcached");
    }
    if segments.contains(&"SQS") {
        return Some("sqs");
    }
    if segments.contains(&"S3") {
        return Some("s3");
    }
    if upper.contains("DATABASE") || segments.contains(&"DB") {
        return Some("postgresql");
    }
    None
}

pub(crate) struct InfraPattern {
    pub regex: Regex,
    pub kind: InfraKind,
    pub conn: ConnRef,
}

/// One webhook idiom; the target is in the `url` capture group
pub(crate) struct WebhookPattern {
    pub regex: Regex,
    pub direction: WebhookDirection,
    pub provider: Option<&'static str>,
}

/// A language's complete detection surface
pub(crate) struct PatternCatalog {
    pub comments: CommentSyntax,
    pub imports: Vec<SdkImportPattern>,
    pub sdk_calls: Vec<SdkCallPattern>,
    pub http: Vec<HttpPattern>,
    pub infra: Vec<InfraPattern>,
    pub webhooks: Vec<WebhookPattern>,
    pub receiver_skip: &'static [&'static str],
}

/// A user-configured SDK mapping with its patterns compiled
pub struct CompiledSdk {
    pub provider: String,
    pub package: String,
    pub regexes: Vec<Regex>,
}

impl CompiledSdk {
    pub(crate) fn compile(sdk: &CustomSdk) -> Option<Self> {
        let regexes: Vec<Regex> = sdk
            .patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        if regexes.is_empty() {
            return None;
        }
        Some(Self {
            provider: sdk.provider.clone(),
            package: sdk.package.clone(),
            regexes,
        })
    }
}

/// Connection-URL idioms shared by every language catalogue
///
/// These match literal connection strings wherever they appear on a code
/// line; the per-language catalogues add env-lookup and client-constructor
/// idioms on top.
pub(crate) fn common_infra_url_patterns() -> Vec<InfraPattern> {
    const URL_TAIL: &str = r#"[^\s'"`]+"#;
    let url = |scheme: &str| format!(r#"(?P<url>{scheme}://{URL_TAIL})"#);
    vec![
        InfraPattern {
            regex: Regex::new(&url("postgres(?:ql)?")).unwrap(),
            kind: InfraKind::Fixed("postgresql"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(&url("mysql")).unwrap(),
            kind: InfraKind::Fixed("mysql"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(&url(r"mongodb(?:\+srv)?")).unwrap(),
            kind: InfraKind::Fixed("mongodb"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(&url("rediss?")).unwrap(),
            kind: InfraKind::Fixed("redis"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(&url("amqps?")).unwrap(),
            kind: InfraKind::Fixed("rabbitmq"),
            conn: ConnRef::Url,
        },
        InfraPattern {
            regex: Regex::new(&url("kafka")).unwrap(),
            kind: InfraKind::Fixed("kafka"),
            conn: ConnRef::Url,
        },
    ]
}

/// Manifest path relative to the scan root, with forward slashes
pub(crate) fn manifest_rel(path: &Path, scan_root: &Path) -> String {
    let rel = path.strip_prefix(scan_root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Build a manifest-derived package finding (no locations, usage 0)
pub(crate) fn package_finding(
    name: impl Into<String>,
    ecosystem: &str,
    current_version: impl Into<String>,
    version_constraint: Option<String>,
    manifest_file: &str,
    confidence: Confidence,
) -> Finding {
    Finding::declared(
        FindingKind::Package {
            name: name.into(),
            ecosystem: ecosystem.to_owned(),
            current_version: current_version.into(),
            version_constraint,
            manifest_file: manifest_file.to_owned(),
        },
        confidence,
    )
}

/// Extract a single concrete version from a constraint expression
///
/// Handles `==X`, `=X`, `>=X`, `~=X`, `^X`, `~X`, and bare versions.
/// Anything else (ranges, wildcards, git refs) resolves to `None`, which
/// parsers report as `"unknown"` with medium confidence.
pub(crate) fn resolve_version_constraint(spec: &str) -> (String, Confidence) {
    let spec = spec.trim();
    let stripped = spec
        .strip_prefix("==")
        .or_else(|| spec.strip_prefix(">="))
        .or_else(|| spec.strip_prefix("~="))
        .or_else(|| spec.strip_prefix('^'))
        .or_else(|| spec.strip_prefix('~'))
        .or_else(|| spec.strip_prefix('='))
        .unwrap_or(spec)
        .trim();

    let looks_concrete = !stripped.is_empty()
        && stripped
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        && stripped.chars().next().is_some_and(|c| c.is_ascii_digit());

    if looks_concrete {
        (stripped.to_owned(), Confidence::High)
    } else {
        ("unknown".to_owned(), Confidence::Medium)
    }
}

/// Normalise a package name the way the PyPI index does
pub(crate) fn normalize_pypi_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

/// Strip comments from one line, carrying block-comment state
///
/// Returns the effective code portion. Quote-aware so `//` inside a string
/// literal (every `https://` URL) survives, and `#` inside quotes does too.
pub(crate) fn strip_comments<'a>(
    line: &'a str,
    syntax: &CommentSyntax,
    in_block: &mut bool,
) -> std::borrow::Cow<'a, str> {
    use std::borrow::Cow;

    let mut out = String::new();
    let mut rest = line;

    if *in_block {
        let close = syntax.block.map(|(_, c)| c).unwrap_or("*/");
        match rest.find(close) {
            Some(idx) => {
                *in_block = false;
                rest = &rest[idx + close.len()..];
            },
            None => return Cow::Borrowed(""),
        }
    }

    let mut i = 0;
    let mut quote: Option<char> = None;
    while i < rest.len() {
        let Some(ch) = rest[i..].chars().next() else {
            break;
        };
        if let Some(q) = quote {
            if ch == '\\' {
                // Copy the escape and the escaped char verbatim
                let escaped_len = rest[i + 1..].chars().next().map(char::len_utf8).unwrap_or(0);
                out.push_str(&rest[i..i + 1 + escaped_len]);
                i += 1 + escaped_len;
                continue;
            }
            if ch == q {
                quote = None;
            }
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }
        if ch == '"' || ch == '\'' || ch == '`' {
            quote = Some(ch);
            out.push(ch);
            i += 1;
            continue;
        }
        if let Some((open, close)) = syntax.block {
            if rest[i..].starts_with(open) {
                match rest[i + open.len()..].find(close) {
                    Some(idx) => {
                        i += open.len() + idx + close.len();
                        continue;
                    },
                    None => {
                        *in_block = true;
                        return Cow::Owned(out);
                    },
                }
            }
        }
        if syntax.line.iter().any(|m| rest[i..].starts_with(m)) {
            return Cow::Owned(out);
        }
        out.push(ch);
        i += ch.len_utf8();
    }

    if out == line {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(out)
    }
}

fn provider_for_url(url: &str) -> Option<&'static str> {
    PROVIDER_HOSTS
        .iter()
        .find(|(host, _)| {
            url.split("://")
                .nth(1)
                .map(|rest| rest.split(['/', '?']).next().unwrap_or(""))
                .is_some_and(|h| h == *host || h.ends_with(&format!(".{host}")))
        })
        .map(|(_, provider)| *provider)
}

/// Index of an SDK finding per provider, for per-file deduplication
struct SdkSlot {
    finding_idx: usize,
}

/// Scan one source file against a catalogue
///
/// This is the engine behind every plugin's `analyze`: import pre-pass with
/// per-provider SDK dedup, comment-aware line loop, env resolution for URL
/// templates, and `(line, kind)` duplicate suppression.
pub(crate) fn scan_source(catalog: &PatternCatalog, ctx: &AnalyzeContext<'_>) -> Vec<Finding> {
    let lines: Vec<&str> = ctx.source_text.lines().collect();

    let mut in_block = false;
    let stripped: Vec<String> = lines
        .iter()
        .map(|line| strip_comments(line, &catalog.comments, &mut in_block).into_owned())
        .collect();

    let mut findings: Vec<Finding> = Vec::new();
    let mut sdk_by_provider: std::collections::HashMap<String, SdkSlot> =
        std::collections::HashMap::new();
    let mut emitted: HashSet<(u32, &'static str)> = HashSet::new();

    // Import pre-pass: one SDK finding per recognised provider
    for (idx, code) in stripped.iter().enumerate() {
        let line_no = (idx + 1) as u32;
        for pattern in &catalog.imports {
            if let Some(caps) = pattern.regex.captures(code) {
                let service = caps
                    .name("service")
                    .map(|m| m.as_str().to_lowercase())
                    .or_else(|| pattern.service.map(str::to_owned));
                upsert_sdk_owned(
                    &mut findings,
                    &mut sdk_by_provider,
                    pattern.provider,
                    pattern.sdk_package,
                    service,
                    None,
                    Confidence::High,
                    Location::new(ctx.file_path, line_no).with_context(&redact(lines[idx])),
                );
            }
        }
    }

    for (idx, code) in stripped.iter().enumerate() {
        let line_no = (idx + 1) as u32;
        if code.trim().is_empty() {
            continue;
        }
        let location = || Location::new(ctx.file_path, line_no).with_context(&redact(lines[idx]));

        // SDK constructor/call enrichment
        for pattern in &catalog.sdk_calls {
            if let Some(caps) = pattern.regex.captures(code) {
                let method = if pattern.has_method_capture {
                    caps.name("method").map(|m| m.as_str().to_owned())
                } else {
                    None
                };
                let service = caps
                    .name("service")
                    .map(|m| m.as_str().to_lowercase())
                    .or_else(|| pattern.service.map(str::to_owned));
                upsert_sdk_owned(
                    &mut findings,
                    &mut sdk_by_provider,
                    pattern.provider,
                    pattern.sdk_package,
                    service,
                    method,
                    Confidence::Medium,
                    location(),
                );
            }
        }

        // Custom SDK mappings from config
        for custom in ctx.custom_sdks {
            if custom.regexes.iter().any(|r| r.is_match(code)) {
                upsert_sdk_owned(
                    &mut findings,
                    &mut sdk_by_provider,
                    &custom.provider,
                    &custom.package,
                    None,
                    None,
                    Confidence::High,
                    location(),
                );
            }
        }

        // HTTP call sites
        for pattern in &catalog.http {
            if !emitted.contains(&(line_no, "api")) {
                if let Some(caps) = pattern.regex.captures(code) {
                    if let Some(recv) = caps.name("recv") {
                        if catalog.receiver_skip.contains(&recv.as_str()) {
                            continue;
                        }
                    }
                    let Some(url) = caps.name("url").map(|m| m.as_str()) else {
                        continue;
                    };
                    let method = match &pattern.method {
                        MethodSpec::Fixed(verb) => Some((*verb).to_owned()),
                        MethodSpec::FromCapture => {
                            caps.name("method").map(|m| m.as_str().to_uppercase())
                        },
                        MethodSpec::Unknown => None,
                    };
                    if let Some(finding) = api_finding(url, method, ctx, location()) {
                        emitted.insert((line_no, "api"));
                        findings.push(finding);
                    }
                }
            }
        }

        // Infrastructure clients
        for pattern in &catalog.infra {
            if emitted.contains(&(line_no, "infrastructure")) {
                break;
            }
            if let Some(caps) = pattern.regex.captures(code) {
                let (connection_ref, confidence) = match &pattern.conn {
                    ConnRef::Url => match caps.name("url") {
                        Some(url) => (redact(url.as_str()), Confidence::High),
                        None => continue,
                    },
                    ConnRef::EnvVar => match caps.name("var") {
                        Some(var) => (var.as_str().to_owned(), Confidence::Medium),
                        None => continue,
                    },
                    ConnRef::BootstrapLookback => {
                        match lookback_bootstrap_servers(&stripped, idx) {
                            Some(brokers) => (redact(&brokers), Confidence::High),
                            None => ("bootstrap.servers".to_owned(), Confidence::Low),
                        }
                    },
                };
                let kind = match &pattern.kind {
                    InfraKind::Fixed(kind) => (*kind).to_owned(),
                    InfraKind::Dialect => match caps.name("dialect") {
                        Some(dialect) => normalize_dialect(dialect.as_str()),
                        None => continue,
                    },
                    InfraKind::FromVarName => match infra_kind_for_var(&connection_ref) {
                        Some(kind) => kind.to_owned(),
                        None => continue,
                    },
                };
                let resolved_host = ctx.env.resolve_host(&connection_ref);
                emitted.insert((line_no, "infrastructure"));
                findings.push(Finding::new(
                    FindingKind::Infrastructure { kind, connection_ref, resolved_host },
                    confidence,
                    location(),
                ));
            }
        }

        // Webhook idioms
        for pattern in &catalog.webhooks {
            if emitted.contains(&(line_no, "webhook")) {
                break;
            }
            if let Some(caps) = pattern.regex.captures(code) {
                let Some(target) = caps.name("url").map(|m| m.as_str()) else {
                    continue;
                };
                let target_url = redact(target);
                let confidence = if target_url.starts_with("http://")
                    || target_url.starts_with("https://")
                    || (pattern.direction == WebhookDirection::InboundCallback
                        && target_url.starts_with('/'))
                {
                    Confidence::High
                } else {
                    Confidence::Medium
                };
                emitted.insert((line_no, "webhook"));
                findings.push(Finding::new(
                    FindingKind::Webhook {
                        direction: pattern.direction,
                        target_url,
                        provider: pattern.provider.map(str::to_owned),
                    },
                    confidence,
                    location(),
                ));
            }
        }
    }

    findings
}

/// Build an API finding, resolving `${VAR}` slots through the env map
fn api_finding(
    url: &str,
    method: Option<String>,
    ctx: &AnalyzeContext<'_>,
    location: Location,
) -> Option<Finding> {
    let has_slots = url.contains("${");
    let resolution = ctx.env.resolve_url(url);

    let (final_url, resolved_url, confidence) = if !has_slots {
        let redacted = redact(url);
        let confidence = if redacted.starts_with("http://") || redacted.starts_with("https://") {
            Confidence::High
        } else {
            Confidence::Medium
        };
        (redacted, None, confidence)
    } else {
        match (&resolution.resolved, resolution.confidence) {
            (Some(resolved), Confidence::High) => {
                // Fully substituted: the resolved URL becomes the entry URL
                let confidence = if resolved.starts_with("http://")
                    || resolved.starts_with("https://")
                {
                    Confidence::High
                } else {
                    Confidence::Medium
                };
                (resolved.clone(), Some(resolved.clone()), confidence)
            },
            (Some(resolved), _) => (redact(url), Some(resolved.clone()), Confidence::Medium),
            (None, _) => (redact(url), None, Confidence::Low),
        }
    };

    // URLs that are neither http(s) nor templates are dropped entirely
    if !(final_url.starts_with("http://")
        || final_url.starts_with("https://")
        || final_url.starts_with("${"))
    {
        return None;
    }

    let provider = provider_for_url(resolved_url.as_deref().unwrap_or(&final_url));
    Some(Finding::new(
        FindingKind::Api {
            url: final_url,
            method,
            provider: provider.map(str::to_owned),
            resolved_url,
        },
        confidence,
        location,
    ))
}

/// Kafka convention: brokers are assigned to `bootstrap.servers` shortly
/// before the producer/consumer is constructed
fn lookback_bootstrap_servers(stripped: &[String], idx: usize) -> Option<String> {
    static BOOTSTRAP_RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r#"bootstrap[._]servers["']?\s*[,:=)]+\s*["']([^"']+)["']"#).unwrap()
    });
    let start = idx.saturating_sub(KAFKA_LOOKBACK_LINES);
    stripped[start..=idx]
        .iter()
        .rev()
        .find_map(|line| BOOTSTRAP_RE.captures(line).map(|c| c[1].to_owned()))
}

/// Insert or enrich the per-provider SDK finding for this file
#[allow(clippy::too_many_arguments)]
fn upsert_sdk_owned(
    findings: &mut Vec<Finding>,
    slots: &mut std::collections::HashMap<String, SdkSlot>,
    provider: &str,
    sdk_package: &str,
    service: Option<String>,
    api_method: Option<String>,
    confidence: Confidence,
    location: Location,
) {
    if let Some(slot) = slots.get(provider) {
        if let FindingKind::Sdk { services_used, api_methods, .. } =
            &mut findings[slot.finding_idx].kind
        {
            if let Some(service) = service {
                if !services_used.contains(&service) {
                    services_used.push(service);
                }
            }
            if let Some(method) = api_method {
                if !api_methods.contains(&method) {
                    api_methods.push(method);
                }
            }
        }
        let entry = &mut findings[slot.finding_idx];
        entry.confidence = entry.confidence.max(confidence);
        if !entry
            .locations
            .iter()
            .any(|l| l.dedup_key() == location.dedup_key())
        {
            entry.locations.push(location);
        }
        return;
    }

    let finding = Finding::new(
        FindingKind::Sdk {
            provider: provider.to_owned(),
            sdk_package: sdk_package.to_owned(),
            services_used: service.into_iter().collect(),
            api_methods: api_method.into_iter().collect(),
        },
        confidence,
        location,
    );
    slots.insert(provider.to_owned(), SdkSlot { finding_idx: findings.len() });
    findings.push(finding);
}

#[cfg(test)]
mod tests {
    use super::*;

    const C_STYLE: CommentSyntax = CommentSyntax { line: &["//"], block: Some(("/*", "*/")) };
    const HASH_STYLE: CommentSyntax = CommentSyntax { line: &["#"], block: None };

    #[test]
    fn test_strip_line_comment() {
        let mut in_block = false;
        assert_eq!(strip_comments("let x = 1; // note", &C_STYLE, &mut in_block), "let x = 1; ");
    }

    #[test]
    fn test_url_survives_line_comment_strip() {
        let mut in_block = false;
        let line = r#"fetch("https://api.example.com/v1") // call"#;
        let out = strip_comments(line, &C_STYLE, &mut in_block);
        assert!(out.contains("https://api.example.com/v1"));
        assert!(!out.contains("call"));
    }

    #[test]
    fn test_hash_in_string_survives() {
        let mut in_block = false;
        let line = r#"url = "https://x.test/page#frag"  # trailing"#;
        let out = strip_comments(line, &HASH_STYLE, &mut in_block);
        assert!(out.contains("#frag"));
        assert!(!out.contains("trailing"));
    }

    #[test]
    fn test_block_comment_state_carries() {
        let mut in_block = false;
        assert_eq!(strip_comments("code(); /* open", &C_STYLE, &mut in_block), "code(); ");
        assert!(in_block);
        assert_eq!(strip_comments("still hidden", &C_STYLE, &mut in_block), "");
        assert_eq!(strip_comments("end */ tail()", &C_STYLE, &mut in_block), " tail()");
        assert!(!in_block);
    }

    #[test]
    fn test_inline_block_comment() {
        let mut in_block = false;
        assert_eq!(
            strip_comments("a /* b */ c", &C_STYLE, &mut in_block),
            "a  c"
        );
        assert!(!in_block);
    }

    #[test]
    fn test_escaped_quote_stays_in_string() {
        let mut in_block = false;
        let line = r#"say("a \" b") // gone"#;
        let out = strip_comments(line, &C_STYLE, &mut in_block);
        assert_eq!(out, r#"say("a \" b") "#);
    }

    #[test]
    fn test_resolve_version_constraint_forms() {
        assert_eq!(resolve_version_constraint("==1.2.3"), ("1.2.3".into(), Confidence::High));
        assert_eq!(resolve_version_constraint(">=7.0.0"), ("7.0.0".into(), Confidence::High));
        assert_eq!(resolve_version_constraint("~=2.1"), ("2.1".into(), Confidence::High));
        assert_eq!(resolve_version_constraint("^1.4.0"), ("1.4.0".into(), Confidence::High));
        assert_eq!(resolve_version_constraint("1.0.0"), ("1.0.0".into(), Confidence::High));
        assert_eq!(
            resolve_version_constraint(">=1.0,<2.0"),
            ("unknown".into(), Confidence::Medium)
        );
        assert_eq!(resolve_version_constraint("*"), ("unknown".into(), Confidence::Medium));
    }

    #[test]
    fn test_normalize_pypi_name() {
        assert_eq!(normalize_pypi_name("Flask_SQLAlchemy"), "flask-sqlalchemy");
    }

    #[test]
    fn test_provider_for_url() {
        assert_eq!(provider_for_url("https://api.stripe.com/v1/charges"), Some("stripe"));
        assert_eq!(provider_for_url("https://internal.example.com"), None);
    }

    #[test]
    fn test_infra_kind_for_var() {
        assert_eq!(infra_kind_for_var("DATABASE_URL"), Some("postgresql"));
        assert_eq!(infra_kind_for_var("REDIS_URL"), Some("redis"));
        assert_eq!(infra_kind_for_var("KAFKA_BROKERS"), Some("kafka"));
        assert_eq!(infra_kind_for_var("AWS_S3_BUCKET"), Some("s3"));
        assert_eq!(infra_kind_for_var("CLOUDAMQP_URL"), Some("rabbitmq"));
        assert_eq!(infra_kind_for_var("API_TOKEN"), None);
    }

    #[test]
    fn test_normalize_dialect() {
        assert_eq!(normalize_dialect("postgres"), "postgresql");
        assert_eq!(normalize_dialect("pgsql"), "postgresql");
        assert_eq!(normalize_dialect("mariadb"), "mysql");
        assert_eq!(normalize_dialect("oracle"), "oracle");
    }

    #[test]
    fn test_lookback_bootstrap_servers() {
        let lines: Vec<String> = vec![
            r#"props.put("bootstrap.servers", "broker-1:9092");"#.to_owned(),
            String::new(),
            String::new(),
            String::new(),
            "new KafkaProducer<>(props);".to_owned(),
        ];
        assert_eq!(lookback_bootstrap_servers(&lines, 4).as_deref(), Some("broker-1:9092"));
        let far: Vec<String> = std::iter::once(lines[0].clone())
            .chain(std::iter::repeat_with(String::new).take(20))
            .chain(std::iter::once(lines[4].clone()))
            .collect();
        assert_eq!(lookback_bootstrap_servers(&far, 21), None);
    }
}
