//! Tester Configuration
//!
//! YAML daemon configuration. Every field has a default, so an empty or
//! missing file yields a working local setup.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smc_dbi::{MongoConfig, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_DB_URI};
use smc_nas::MutationLayout;

use crate::control::ControlPolicy;
use crate::tester_sm::RetryPolicy;

/// Default protocol listen address
pub const DEFAULT_LISTEN: &str = "127.0.0.1:1337";
/// Default AMF SBI host
pub const DEFAULT_AMF_HOST: &str = "127.0.0.5";
/// Default AMF SBI port
pub const DEFAULT_AMF_PORT: u16 = 7777;
/// Default pause between a finished testcase and the deregistration notify
pub const DEFAULT_DEREG_DELAY_MS: u64 = 5000;

/// Top-level daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Address the UE-facing protocol socket binds to
    pub listen: String,
    /// AMF control endpoint
    pub amf_sbi: AmfSbiConfig,
    /// Result database
    pub db: DbConfig,
    /// Nibble positions of the patched SMC fields
    pub layout: MutationLayout,
    /// Per-step retry cap
    pub retry: RetryConfig,
    /// Control signal delivery
    pub control: ControlConfig,
    /// Pause before the deregistration notify, in milliseconds
    pub dereg_delay_ms: u64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            amf_sbi: AmfSbiConfig::default(),
            db: DbConfig::default(),
            layout: MutationLayout::default(),
            retry: RetryConfig::default(),
            control: ControlConfig::default(),
            dereg_delay_ms: DEFAULT_DEREG_DELAY_MS,
        }
    }
}

impl TesterConfig {
    /// Parse a configuration document
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid tester configuration")
    }

    /// Load the configuration file, falling back to defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!(
                "Configuration file not found: {} (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }

        log::info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn dereg_delay(&self) -> Duration {
        Duration::from_millis(self.dereg_delay_ms)
    }
}

/// AMF SBI (control endpoint) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmfSbiConfig {
    pub host: String,
    pub port: u16,
    /// Prefix prepended to both control paths
    pub base_path: String,
    /// Enable/disable path; `{enabled}` is replaced by `true` or `false`
    pub enable_path: String,
    /// Deregistration notify path; `{supi}` is replaced by the subscriber identity
    pub dereg_path: String,
    pub connect_timeout_ms: u64,
}

impl Default for AmfSbiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_AMF_HOST.to_string(),
            port: DEFAULT_AMF_PORT,
            base_path: String::new(),
            enable_path: "/testcase-enable/v1/{enabled}".to_string(),
            dereg_path: "/namf-callback/v1/{supi}/dereg-notify".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

/// Result database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_DB_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl From<&DbConfig> for MongoConfig {
    fn from(db: &DbConfig) -> Self {
        MongoConfig {
            uri: db.uri.clone(),
            database: db.database.clone(),
            collection: db.collection.clone(),
        }
    }
}

/// Retry cap for the MsgType, Msg and Res steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Failed attempts before the testcase is aborted (0 = never abort)
    pub max_attempts: u32,
    /// Base backoff in milliseconds, multiplied by the attempt count
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Control signal dispatch settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Concurrent control requests
    pub workers: usize,
    /// Tries per signal
    pub max_attempts: u32,
    /// Pause between tries, in milliseconds
    pub backoff_ms: u64,
    /// Per-request timeout, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            backoff_ms: 500,
            request_timeout_ms: 10_000,
        }
    }
}

impl ControlConfig {
    pub fn policy(&self) -> ControlPolicy {
        ControlPolicy {
            workers: self.workers.max(1),
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
