//! Minimal configuration loading for ntags.
//!
//! This crate provides configuration loading with minimal dependencies,
//! designed to be imported by every ntags crate without causing circular
//! dependency issues.
//!
//! # Configuration Sections
//!
//! - **Session** (`SessionConfig`): how the tag session facade reacts to
//!   overlapping start requests, and the alert text shown while a session runs.
//! - **Telemetry** (`TelemetryConfig`): log filtering.
//! - **Sim** (`SimConfig`): fixtures for the in-memory simulated transport.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ntags_conf::NtagsConfig;
//!
//! let config = NtagsConfig::load().expect("Failed to load config");
//! println!("log level: {}", config.telemetry.log_level);
//! for tag in &config.sim.tags {
//!     println!("sim tag {} ({})", tag.id, tag.capability);
//! }
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/ntags/config.toml` (system)
//! 2. `~/.config/ntags/config.toml` (user)
//! 3. `./ntags.toml` (local override)
//! 4. Environment variables (`NTAGS_*`)
//!
//! # Example Config
//!
//! ```toml
//! [session]
//! concurrent_start = "reject"
//! scan_alert = "Hold your device near the NFC tag."
//!
//! [telemetry]
//! log_level = "debug"
//!
//! [sim]
//! available = true
//!
//! [[sim.tags]]
//! id = "poster"
//! capability = "read_write"
//! records = ["hello", "world"]
//! ```

pub mod loader;
pub mod session;
pub mod sim;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use session::{SessionConfig, StartPolicy, TelemetryConfig};
pub use sim::{SimConfig, SimTagConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete ntags configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NtagsConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub sim: SimConfig,
}

impl NtagsConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/ntags/config.toml`
    /// 3. `~/.config/ntags/config.toml`
    /// 4. `./ntags.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file replacing `./ntags.toml`.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = NtagsConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# ntags Configuration\n\n");

        output.push_str("[session]\n");
        output.push_str(&format!(
            "concurrent_start = {}\n",
            quote(&self.session.concurrent_start.to_string())
        ));
        output.push_str(&format!("scan_alert = {}\n", quote(&self.session.scan_alert)));
        output.push_str(&format!("write_alert = {}\n", quote(&self.session.write_alert)));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {}\n", quote(&self.telemetry.log_level)));

        output.push_str("\n[sim]\n");
        output.push_str(&format!("available = {}\n", self.sim.available));

        for tag in &self.sim.tags {
            output.push_str("\n[[sim.tags]]\n");
            output.push_str(&format!("id = {}\n", quote(&tag.id)));
            output.push_str(&format!("capability = {}\n", quote(&tag.capability)));
            output.push_str("records = [");
            let records: Vec<String> = tag.records.iter().map(|r| quote(r)).collect();
            output.push_str(&records.join(", "));
            output.push_str("]\n");
            for (key, value) in [
                ("connect_error", &tag.connect_error),
                ("query_error", &tag.query_error),
                ("read_error", &tag.read_error),
                ("write_error", &tag.write_error),
            ] {
                if let Some(v) = value {
                    output.push_str(&format!("{} = {}\n", key, quote(v)));
                }
            }
        }

        output
    }
}

/// Render `s` as a TOML string literal.
fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}
