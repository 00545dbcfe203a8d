//! Session and telemetry configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a start request does while another session is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Invalidate the live session and start the new one.
    #[default]
    Supersede,
    /// Keep the live session and refuse the new request.
    Reject,
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPolicy::Supersede => write!(f, "supersede"),
            StartPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for StartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supersede" => Ok(StartPolicy::Supersede),
            "reject" => Ok(StartPolicy::Reject),
            other => Err(format!("unknown start policy: {}", other)),
        }
    }
}

/// Tag session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Policy for start requests that overlap a live session.
    /// Default: supersede
    #[serde(default)]
    pub concurrent_start: StartPolicy,

    /// Alert shown by the platform sheet while a read session runs.
    #[serde(default = "SessionConfig::default_scan_alert")]
    pub scan_alert: String,

    /// Alert shown by the platform sheet while a write session runs.
    #[serde(default = "SessionConfig::default_write_alert")]
    pub write_alert: String,
}

impl SessionConfig {
    fn default_scan_alert() -> String {
        "Hold your device near the NFC tag.".to_string()
    }

    fn default_write_alert() -> String {
        "Hold your device near the NFC tag to write.".to_string()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            concurrent_start: StartPolicy::default(),
            scan_alert: Self::default_scan_alert(),
            write_alert: Self::default_write_alert(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
