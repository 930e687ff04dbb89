//! Manifest/lockfile reconciliation
//!
//! A plugin's `analyze_manifests` output mixes manifest-declared packages
//! (constraints) with lockfile-declared ones (resolved versions). The merge
//! key is `(ecosystem, name)`: a package present in both sets keeps the
//! manifest's constraint and takes the lockfile's resolved version; a
//! lockfile-only package passes through verbatim, which is how transitive
//! dependencies enter the manifest.

use std::collections::HashMap;

use crate::types::{Finding, FindingKind};

/// Merge one plugin's manifest findings with its lockfile findings
pub fn reconcile(findings: Vec<Finding>, lockfile_basenames: &[&str]) -> Vec<Finding> {
    let (mut lockfile_versions, mut consumed): (HashMap<(String, String), Finding>, _) =
        (HashMap::new(), std::collections::HashSet::new());

    let mut manifest_declared: Vec<Finding> = Vec::new();
    let mut passthrough: Vec<Finding> = Vec::new();
    let mut lockfile_order: Vec<(String, String)> = Vec::new();

    for finding in findings {
        match &finding.kind {
            FindingKind::Package { name, ecosystem, manifest_file, .. } => {
                let basename = manifest_file.rsplit('/').next().unwrap_or(manifest_file);
                let key = (ecosystem.clone(), name.clone());
                if lockfile_basenames.contains(&basename) {
                    if !lockfile_versions.contains_key(&key) {
                        lockfile_order.push(key.clone());
                        lockfile_versions.insert(key, finding);
                    }
                } else {
                    manifest_declared.push(finding);
                }
            },
            _ => passthrough.push(finding),
        }
    }

    let mut merged = Vec::with_capacity(manifest_declared.len() + lockfile_order.len());
    for mut finding in manifest_declared {
        if let FindingKind::Package { name, ecosystem, current_version, .. } = &mut finding.kind {
            let key = (ecosystem.clone(), name.clone());
            if let Some(locked) = lockfile_versions.get(&key) {
                if let FindingKind::Package { current_version: locked_version, .. } = &locked.kind
                {
                    *current_version = locked_version.clone();
                }
                finding.confidence = finding.confidence.max(locked.confidence);
                consumed.insert(key);
            }
        }
        merged.push(finding);
    }

    // Lockfile-only entries capture transitive dependencies
    for key in lockfile_order {
        if !consumed.contains(&key) {
            if let Some(finding) = lockfile_versions.remove(&key) {
                merged.push(finding);
            }
        }
    }

    merged.extend(passthrough);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::patterns::package_finding;
    use crate::types::{Confidence, Location};

    const LOCKFILES: &[&str] = &["poetry.lock"];

    fn stripe_manifest() -> Finding {
        package_finding(
            "stripe",
            "pypi",
            "7.0.0",
            Some(">=7.0.0".to_owned()),
            "requirements.txt",
            Confidence::High,
        )
    }

    fn stripe_locked(version: &str) -> Finding {
        package_finding("stripe", "pypi", version, None, "poetry.lock", Confidence::High)
    }

    #[test]
    fn test_manifest_only_passes_verbatim() {
        let merged = reconcile(vec![stripe_manifest()], LOCKFILES);
        assert_eq!(merged.len(), 1);
        assert!(matches!(
            &merged[0].kind,
            FindingKind::Package { current_version, version_constraint, .. }
                if current_version == "7.0.0" && version_constraint.as_deref() == Some(">=7.0.0")
        ));
    }

    #[test]
    fn test_lockfile_pins_version_constraint_survives() {
        let merged = reconcile(vec![stripe_manifest(), stripe_locked("7.1.0")], LOCKFILES);
        assert_eq!(merged.len(), 1);
        assert!(matches!(
            &merged[0].kind,
            FindingKind::Package { current_version, version_constraint, manifest_file, .. }
                if current_version == "7.1.0"
                    && version_constraint.as_deref() == Some(">=7.0.0")
                    && manifest_file == "requirements.txt"
        ));
    }

    #[test]
    fn test_lockfile_only_captures_transitives() {
        let merged = reconcile(
            vec![stripe_manifest(), stripe_locked("7.1.0"), {
                package_finding("certifi", "pypi", "2024.2.2", None, "poetry.lock", Confidence::High)
            }],
            LOCKFILES,
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|f| matches!(
            &f.kind,
            FindingKind::Package { name, current_version, .. }
                if name == "certifi" && current_version == "2024.2.2"
        )));
    }

    #[test]
    fn test_non_package_findings_pass_through() {
        let api = Finding::new(
            FindingKind::Api {
                url: "https://api.stripe.com/v1".to_owned(),
                method: None,
                provider: None,
                resolved_url: None,
            },
            Confidence::High,
            Location::new("a.py", 1),
        );
        let merged = reconcile(vec![api.clone()], LOCKFILES);
        assert_eq!(merged, vec![api]);
    }

    #[test]
    fn test_merge_key_respects_ecosystem() {
        let npm_stripe = package_finding(
            "stripe",
            "npm",
            "14.0.0",
            Some("^14.0.0".to_owned()),
            "package.json",
            Confidence::High,
        );
        let merged = reconcile(vec![npm_stripe, stripe_locked("7.1.0")], LOCKFILES);
        assert_eq!(merged.len(), 2, "different ecosystems never merge");
    }
}
