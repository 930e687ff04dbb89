//! Manifest schema validation
//!
//! One canonical JSON Schema (draft 2020-12) defines every record shape in
//! the manifest document. The schema is embedded in the binary and compiled
//! once per process; [`parse`] and [`parse_from_string`] are the only ways a
//! document becomes a typed [`Manifest`].

use jsonschema::{ValidationError, Validator};
use once_cell::sync::Lazy;
use serde_json::Value;
use thiserror::Error;

use crate::manifest::Manifest;

/// Byte-length cap applied before parsing untrusted input (50 MiB)
pub const DEFAULT_MAX_PARSE_BYTES: usize = 50 * 1024 * 1024;

/// How many issues the human-readable message carries before truncation
const MESSAGE_ISSUE_LIMIT: usize = 5;

static SCHEMA_JSON: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("manifest-v1.schema.json"))
        .expect("embedded manifest schema is valid JSON")
});

static VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    jsonschema::options()
        .should_validate_formats(true)
        .build(&SCHEMA_JSON)
        .expect("embedded manifest schema compiles")
});

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value
    pub path: String,
    pub message: String,
    /// Schema keyword that failed (`required`, `maxLength`, `enum`, …)
    pub keyword: String,
}

/// Errors produced while turning a document into a [`Manifest`]
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("manifest document is {size} bytes, exceeds the {max} byte parse cap")]
    TooLarge { size: usize, max: usize },

    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Invalid {
        /// Truncated human-readable summary (first five issues)
        message: String,
        /// The full issue list
        issues: Vec<ValidationIssue>,
    },
}

/// Validate a JSON document against schema v1 and deserialize it
pub fn parse(document: &Value) -> Result<Manifest, SchemaError> {
    let issues: Vec<ValidationIssue> = VALIDATOR
        .iter_errors(document)
        .map(issue_from_error)
        .collect();

    if !issues.is_empty() {
        return Err(SchemaError::Invalid { message: summarize(&issues), issues });
    }

    Ok(serde_json::from_value(document.clone())?)
}

/// Validate a document without deserializing it
pub fn validate(document: &Value) -> Result<(), SchemaError> {
    parse(document).map(|_| ())
}

/// Parse a manifest from text, enforcing a byte-length cap first
///
/// The cap bounds parse amplification on untrusted input; pass
/// [`DEFAULT_MAX_PARSE_BYTES`] unless the caller has a tighter budget.
pub fn parse_from_string(text: &str, max_bytes: usize) -> Result<Manifest, SchemaError> {
    if text.len() > max_bytes {
        return Err(SchemaError::TooLarge { size: text.len(), max: max_bytes });
    }
    let document: Value = serde_json::from_str(text)?;
    parse(&document)
}

fn issue_from_error(error: ValidationError<'_>) -> ValidationIssue {
    let path = error.instance_path.to_string();
    ValidationIssue {
        path: if path.is_empty() { "/".to_owned() } else { path },
        message: error.to_string(),
        keyword: keyword_of(&error).to_owned(),
    }
}

fn keyword_of(error: &ValidationError<'_>) -> &'static str {
    use jsonschema::error::ValidationErrorKind as Kind;
    match error.kind {
        Kind::AdditionalProperties { .. } => "additionalProperties",
        Kind::Enum { .. } => "enum",
        Kind::Format { .. } => "format",
        Kind::MaxItems { .. } => "maxItems",
        Kind::MaxLength { .. } => "maxLength",
        Kind::Maximum { .. } => "maximum",
        Kind::MinItems { .. } => "minItems",
        Kind::MinLength { .. } => "minLength",
        Kind::Minimum { .. } => "minimum",
        Kind::Pattern { .. } => "pattern",
        Kind::Required { .. } => "required",
        Kind::Type { .. } => "type",
        _ => "schema",
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    let mut parts: Vec<String> = issues
        .iter()
        .take(MESSAGE_ISSUE_LIMIT)
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect();
    if issues.len() > MESSAGE_ISSUE_LIMIT {
        parts.push(format!("…and {} more", issues.len() - MESSAGE_ISSUE_LIMIT));
    }
    format!("manifest failed schema validation: {}", parts.join("; "))
}
