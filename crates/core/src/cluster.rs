//! Cluster removal request types and validation.
//!
//! [`RemovalRequest`] is the immutable job request handed to the
//! dispatcher: the target cluster, which optional components take part
//! in the teardown, and the correlation token that routes progress back
//! to the caller.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::CorrelationToken;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Feature sets torn down with every removal.
pub const DEFAULT_FEATURE_SETS: &[&str] = &["opscenter-core"];

/// Upper bound on a cluster name, matching Kubernetes object names.
pub const MAX_CLUSTER_NAME_LEN: usize = 253;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Optional subsystems that participate in the removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalComponents {
    /// Uninstall FluxCD from the cluster.
    pub fluxcd: bool,
    /// Uninstall the license server from the cluster.
    pub license_server: bool,
    pub feature_sets: Vec<String>,
}

impl Default for RemovalComponents {
    fn default() -> Self {
        Self {
            fluxcd: true,
            license_server: true,
            feature_sets: DEFAULT_FEATURE_SETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What to remove and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOptions {
    pub name: String,
    pub components: RemovalComponents,
}

impl RemovalOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: RemovalComponents::default(),
        }
    }

    pub fn with_fluxcd(mut self, remove: bool) -> Self {
        self.components.fluxcd = remove;
        self
    }

    pub fn with_license_server(mut self, remove: bool) -> Self {
        self.components.license_server = remove;
        self
    }

    /// Check the target name before anything is sent over the network.
    pub fn validate(&self) -> Result<(), CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "cluster name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_CLUSTER_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "cluster name must be at most {MAX_CLUSTER_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A removal job as submitted to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalRequest {
    options: RemovalOptions,
    response_id: CorrelationToken,
}

impl RemovalRequest {
    pub fn new(options: RemovalOptions, response_id: CorrelationToken) -> Self {
        Self {
            options,
            response_id,
        }
    }

    pub fn options(&self) -> &RemovalOptions {
        &self.options
    }

    pub fn cluster_name(&self) -> &str {
        &self.options.name
    }

    pub fn token(&self) -> &CorrelationToken {
        &self.response_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn components_default_to_enabled() {
        let opts = RemovalOptions::new("prod-eu");
        assert!(opts.components.fluxcd);
        assert!(opts.components.license_server);
        assert_eq!(opts.components.feature_sets, vec!["opscenter-core"]);
    }

    #[test]
    fn toggles_override_defaults() {
        let opts = RemovalOptions::new("prod-eu")
            .with_fluxcd(false)
            .with_license_server(false);
        assert!(!opts.components.fluxcd);
        assert!(!opts.components.license_server);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_matches!(
            RemovalOptions::new("   ").validate(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "a".repeat(MAX_CLUSTER_NAME_LEN + 1);
        assert!(RemovalOptions::new(name).validate().is_err());
    }

    #[test]
    fn request_wire_shape() {
        let request = RemovalRequest::new(
            RemovalOptions::new("prod-eu").with_fluxcd(false),
            CorrelationToken::from_raw("T1").unwrap(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["responseId"], "T1");
        assert_eq!(json["options"]["name"], "prod-eu");
        assert_eq!(json["options"]["components"]["fluxcd"], false);
        assert_eq!(json["options"]["components"]["licenseServer"], true);
        assert_eq!(json["options"]["components"]["featureSets"][0], "opscenter-core");
    }
}
