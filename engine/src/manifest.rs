//! The dependency manifest document, schema version 1
//!
//! This is the scanner's external contract: a validated inventory of every
//! external surface the scanned tree touches. Downstream tooling (change
//! watchers, diff reports, CI gates) consumes the JSON encoding and treats
//! the per-entry `id` strings as an opaque public identifier.

use serde::{Deserialize, Serialize};

use crate::types::{Confidence, Location, WebhookDirection};

/// Schema version stamped into every emitted manifest
pub const MANIFEST_VERSION: &str = "1.0";

/// A complete dependency manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub metadata: Metadata,
    pub packages: Vec<PackageEntry>,
    pub apis: Vec<ApiEntry>,
    pub sdks: Vec<SdkEntry>,
    pub infrastructure: Vec<InfrastructureEntry>,
    pub webhooks: Vec<WebhookEntry>,
}

impl Manifest {
    /// Sum of entry counts across all five lists
    pub fn total_entries(&self) -> u32 {
        (self.packages.len()
            + self.apis.len()
            + self.sdks.len()
            + self.infrastructure.len()
            + self.webhooks.len()) as u32
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize as YAML (alternative encoding of the same document)
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Scan-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// RFC 3339 timestamp taken when the scan started
    pub scan_timestamp: String,
    pub scanner_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Languages whose plugins matched at least one file
    pub languages_detected: Vec<String>,
    pub total_dependencies_found: u32,
    pub scan_duration_ms: u64,
}

/// A declared third-party package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub ecosystem: String,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<String>,
    pub confidence: Confidence,
    pub usage_count: u32,
    pub locations: Vec<Location>,
}

impl PackageEntry {
    /// Stable PURL-style identifier: `pkg:<ecosystem>/<name>`
    ///
    /// The version is deliberately omitted so the id survives version bumps
    /// and matches the canonical deduplication key.
    pub fn stable_id(ecosystem: &str, name: &str) -> String {
        format!("pkg:{ecosystem}/{name}")
    }
}

/// An outbound HTTP endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    pub confidence: Confidence,
    pub usage_count: u32,
    pub locations: Vec<Location>,
}

impl ApiEntry {
    /// Stable identifier: `api:<METHOD>:<url>`
    pub fn stable_id(method: Option<&str>, url: &str) -> String {
        format!("api:{}:{}", method.unwrap_or("ANY"), url)
    }
}

/// A vendor SDK usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub provider: String,
    pub sdk_package: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub services_used: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub api_methods: Vec<String>,
    pub confidence: Confidence,
    pub usage_count: u32,
    pub locations: Vec<Location>,
}

impl SdkEntry {
    /// Stable identifier: `sdk:<provider>/<sdk_package>`
    pub fn stable_id(provider: &str, sdk_package: &str) -> String {
        format!("sdk:{provider}/{sdk_package}")
    }
}

/// A direct infrastructure connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub connection_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_host: Option<String>,
    pub confidence: Confidence,
    pub usage_count: u32,
    pub locations: Vec<Location>,
}

impl InfrastructureEntry {
    /// Stable identifier: `infra:<type>/<connection_ref>`
    pub fn stable_id(kind: &str, connection_ref: &str) -> String {
        format!("infra:{kind}/{connection_ref}")
    }
}

/// A webhook registration or callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub direction: WebhookDirection,
    pub target_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub confidence: Confidence,
    pub usage_count: u32,
    pub locations: Vec<Location>,
}

impl WebhookEntry {
    /// Stable identifier: `webhook:<direction>/<target_url>`
    pub fn stable_id(direction: WebhookDirection, target_url: &str) -> String {
        format!("webhook:{}/{}", direction.name(), target_url)
    }
}
