//! Core type definitions for depscope findings
//!
//! A [`Finding`] is the unit analyzers and manifest parsers emit: a tagged
//! record describing one external surface (a declared package, an outbound
//! HTTP call, a vendor SDK, an infrastructure connection, or a webhook)
//! together with the source locations that evidence it. Findings are
//! internal; the aggregator folds them into manifest entries.

use serde::{Deserialize, Serialize};

/// Maximum length of a location context snippet
pub const MAX_CONTEXT_LEN: usize = 512;

/// Qualitative strength of the evidence behind a finding
///
/// Ordered `Low < Medium < High` so the weaker of two signals is `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Get name as emitted in the manifest
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Direction of a webhook finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookDirection {
    /// Code registers a URL with an external service
    OutboundRegistration,
    /// Code exposes a callback endpoint an external service will call
    InboundCallback,
}

impl WebhookDirection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OutboundRegistration => "outbound_registration",
            Self::InboundCallback => "inbound_callback",
        }
    }
}

/// A source location evidencing a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Path relative to the scan root
    pub file: String,
    /// 1-indexed line number
    pub line: u32,
    /// Trimmed source snippet, capped at [`MAX_CONTEXT_LEN`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Free-form usage tag (e.g. the matched API method)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

impl Location {
    /// Create a location with no context
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line, context: None, usage: None }
    }

    /// Attach a context snippet, truncating to the cap on a char boundary
    pub fn with_context(mut self, context: &str) -> Self {
        let trimmed = context.trim();
        let capped = if trimmed.len() > MAX_CONTEXT_LEN {
            let mut end = MAX_CONTEXT_LEN;
            while !trimmed.is_char_boundary(end) {
                end -= 1;
            }
            &trimmed[..end]
        } else {
            trimmed
        };
        self.context = Some(capped.to_owned());
        self
    }

    /// Attach a usage tag
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Deduplication identity for locations
    pub fn dedup_key(&self) -> (&str, u32) {
        (self.file.as_str(), self.line)
    }
}

/// The five kinds of external surface a finding can describe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// A declared third-party package
    Package {
        name: String,
        ecosystem: String,
        current_version: String,
        version_constraint: Option<String>,
        /// Manifest file the declaration came from, relative to the scan root
        manifest_file: String,
    },
    /// An outbound HTTP endpoint
    Api {
        /// May contain `${VAR}` substitution slots
        url: String,
        method: Option<String>,
        provider: Option<String>,
        resolved_url: Option<String>,
    },
    /// A vendor SDK usage
    Sdk {
        provider: String,
        sdk_package: String,
        services_used: Vec<String>,
        api_methods: Vec<String>,
    },
    /// A direct infrastructure connection (database, queue, cache)
    Infrastructure {
        #[serde(rename = "type")]
        kind: String,
        /// Env-var name or redacted connection URL
        connection_ref: String,
        resolved_host: Option<String>,
    },
    /// A webhook registration or callback
    Webhook {
        direction: WebhookDirection,
        target_url: String,
        provider: Option<String>,
    },
}

impl FindingKind {
    /// Canonical deduplication key within the kind's manifest list
    ///
    /// These strings double as the stable entry identifiers exposed to
    /// downstream diffing, minus their kind prefix.
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Package { name, ecosystem, .. } => format!("{ecosystem}:{name}"),
            Self::Api { url, method, .. } => {
                format!("{}:{}", method.as_deref().unwrap_or("ANY"), url)
            },
            Self::Sdk { provider, sdk_package, .. } => format!("{provider}:{sdk_package}"),
            Self::Infrastructure { kind, connection_ref, .. } => {
                format!("{kind}:{connection_ref}")
            },
            Self::Webhook { direction, target_url, .. } => {
                format!("{}:{}", direction.name(), target_url)
            },
        }
    }

    /// Short tag name, used for per-line duplicate suppression in analyzers
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Package { .. } => "package",
            Self::Api { .. } => "api",
            Self::Sdk { .. } => "sdk",
            Self::Infrastructure { .. } => "infrastructure",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// An analyzer-emitted record, pre-aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(flatten)]
    pub kind: FindingKind,
    pub confidence: Confidence,
    pub locations: Vec<Location>,
}

impl Finding {
    /// Create a finding with a single location
    pub fn new(kind: FindingKind, confidence: Confidence, location: Location) -> Self {
        Self { kind, confidence, locations: vec![location] }
    }

    /// Create a finding with no locations (manifest-derived packages only)
    pub fn declared(kind: FindingKind, confidence: Confidence) -> Self {
        Self { kind, confidence, locations: Vec::new() }
    }

    /// Number of distinct `(file, line)` locations
    pub fn usage_count(&self) -> u32 {
        let mut seen = std::collections::HashSet::new();
        self.locations
            .iter()
            .filter(|l| seen.insert(l.dedup_key()))
            .count() as u32
    }
}

/// A per-file failure captured during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file_path: String,
    pub error_message: String,
}

impl FileError {
    pub fn new(file_path: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self { file_path: file_path.into(), error_message: error_message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(Confidence::High.min(Confidence::Medium), Confidence::Medium);
    }

    #[test]
    fn test_context_truncation() {
        let long = "x".repeat(MAX_CONTEXT_LEN + 100);
        let loc = Location::new("a.py", 3).with_context(&long);
        assert_eq!(loc.context.unwrap().len(), MAX_CONTEXT_LEN);
    }

    #[test]
    fn test_usage_count_dedups_by_file_line() {
        let mut finding = Finding::new(
            FindingKind::Api {
                url: "https://api.example.com".to_owned(),
                method: Some("GET".to_owned()),
                provider: None,
                resolved_url: None,
            },
            Confidence::High,
            Location::new("a.py", 10),
        );
        finding.locations.push(Location::new("a.py", 10).with_usage("get"));
        finding.locations.push(Location::new("a.py", 12));
        assert_eq!(finding.usage_count(), 2);
    }

    #[test]
    fn test_canonical_keys() {
        let pkg = FindingKind::Package {
            name: "stripe".to_owned(),
            ecosystem: "pypi".to_owned(),
            current_version: "7.0.0".to_owned(),
            version_constraint: None,
            manifest_file: "requirements.txt".to_owned(),
        };
        assert_eq!(pkg.canonical_key(), "pypi:stripe");

        let api = FindingKind::Api {
            url: "https://api.stripe.com/v1".to_owned(),
            method: None,
            provider: None,
            resolved_url: None,
        };
        assert_eq!(api.canonical_key(), "ANY:https://api.stripe.com/v1");

        let webhook = FindingKind::Webhook {
            direction: WebhookDirection::OutboundRegistration,
            target_url: "https://hooks.example.com/x".to_owned(),
            provider: None,
        };
        assert_eq!(
            webhook.canonical_key(),
            "outbound_registration:https://hooks.example.com/x"
        );
    }

    #[test]
    fn test_finding_kind_serde_tag() {
        let infra = FindingKind::Infrastructure {
            kind: "redis".to_owned(),
            connection_ref: "REDIS_URL".to_owned(),
            resolved_host: None,
        };
        let json = serde_json::to_value(&infra).unwrap();
        assert_eq!(json["kind"], "infrastructure");
        assert_eq!(json["type"], "redis");
    }
}
