// Copyright 2025 Cowboy AI, LLC.

//! Runtime configuration

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::ClassResult;

/// Configuration for a [`Runtime`](crate::Runtime)
///
/// Every field has a default, so a partial JSON document is enough.
///
/// ```
/// use cim_class::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{"root_class_name": "Nuclei"}"#).unwrap();
/// assert_eq!(config.root_class_name, "Nuclei");
/// assert!(config.warn_on_reregister);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name of the root class every hierarchy starts from
    pub root_class_name: String,

    /// Report when `extend` registers over an existing name
    pub warn_on_reregister: bool,

    /// Report when `parent()` names a member no ancestor has
    pub warn_on_missing_parent: bool,

    /// Maximum number of diagnostics kept
    pub diagnostics_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_class_name: "Root".to_string(),
            warn_on_reregister: true,
            warn_on_missing_parent: true,
            diagnostics_capacity: 256,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> ClassResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
