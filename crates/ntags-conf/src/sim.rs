//! Simulated transport fixtures.

use serde::{Deserialize, Serialize};

/// Settings for the in-memory transport used by `ntags-sim` and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Whether the simulated radio reports NFC as available.
    /// Default: true
    #[serde(default = "SimConfig::default_available")]
    pub available: bool,

    /// Tags the simulated radio can be tapped against.
    #[serde(default)]
    pub tags: Vec<SimTagConfig>,
}

impl SimConfig {
    fn default_available() -> bool {
        true
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            available: Self::default_available(),
            tags: Vec::new(),
        }
    }
}

/// One simulated tag.
///
/// `capability` is one of `read_write`, `read_only`, `unsupported`, `unknown`.
/// The `*_error` fields script a failure for that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTagConfig {
    pub id: String,

    #[serde(default = "SimTagConfig::default_capability")]
    pub capability: String,

    /// Text records stored on the tag, in order.
    #[serde(default)]
    pub records: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
}

impl SimTagConfig {
    fn default_capability() -> String {
        "read_write".to_string()
    }
}

impl Default for SimTagConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            capability: Self::default_capability(),
            records: Vec::new(),
            connect_error: None,
            query_error: None,
            read_error: None,
            write_error: None,
        }
    }
}
