//! Configuration file parsing for the subscription coordinator.
//!
//! Loads `config.toml` (path overridable via the `CONFIG_FILE` environment
//! variable). Every section has defaults, so running without a config file
//! gives a working instance wired to the demo merchant policy.
//!
//! The spending policy lives here rather than in code: merchant, token, cap,
//! period, and validity horizon are named fields so policy can vary per
//! deployment (or per plan) without touching the encoder.

use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub modules: ModulesConfig,
    pub cors: CorsConfig,
    pub request: RequestConfig,
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    /// If the file exists but is malformed, returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Load configuration from the `CONFIG_FILE` env var or the default path.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::from_file(config_path)
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the JSON record files.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: ".data".to_string(),
        }
    }
}

/// Spending policy enforced by the subscription hook.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Entity id distinguishing this hook among installed modules.
    pub hook_entity_id: u32,
    /// Only transfers to this merchant pass the hook.
    pub merchant: Address,
    /// ERC-20 token the cap is denominated in.
    pub token: Address,
    /// Maximum spend per period, in the token's smallest unit.
    pub max_per_period: U256,
    /// Billing period length in seconds.
    pub period_secs: u64,
    /// How far ahead of "now" the authorization stays valid, in seconds.
    pub validity_horizon_secs: u64,
    /// Install the hook pre-paused.
    pub paused: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hook_entity_id: 6,
            merchant: address!("0xdbcafd921b6b2e3d92d0d8b6489cf3d84dbf149f"),
            // USDC on Sepolia
            token: address!("0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
            // $10 in 6-decimal units
            max_per_period: U256::from(10_000_000u64),
            // 30 days
            period_secs: 30 * 24 * 60 * 60,
            // 1 year
            validity_horizon_secs: 365 * 24 * 60 * 60,
            paused: false,
        }
    }
}

/// On-chain module addresses and the validation entity id.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Subscription hook module enforcing the spending policy.
    pub subscription_module: Address,
    /// Single-signer validation module the session key signs through.
    pub validation_module: Address,
    /// Entity id of the installed validator.
    pub validation_entity_id: u32,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            subscription_module: address!("0xe0ca7d210ff0cc219072e1727ecb0f2bd67866ba"),
            validation_module: address!("0x00000000000099de0bf6fa90deb851e2a2df7d83"),
            validation_entity_id: 2,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// List of allowed origins. Empty list means allow all (*).
    pub allowed_origins: Vec<String>,
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Maximum request body size in bytes.
    pub max_body_size_bytes: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_body_size_bytes: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_policy() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.policy.hook_entity_id, 6);
        assert_eq!(config.policy.max_per_period, U256::from(10_000_000u64));
        assert_eq!(config.policy.period_secs, 2_592_000);
        assert!(!config.policy.paused);
        assert_eq!(config.modules.validation_entity_id, 2);
        assert_eq!(config.storage.data_dir, ".data");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = CoordinatorConfig::from_file("/tmp/does_not_exist_subcoord.toml").unwrap();
        assert_eq!(config.policy.hook_entity_id, 6);
    }

    #[test]
    fn test_partial_file_overrides_policy() {
        let toml = r#"
[policy]
hook_entity_id = 9
period_secs = 604800

[storage]
data_dir = "/tmp/subcoord-data"
"#;
        let path = format!("/tmp/subcoord_config_{}.toml", std::process::id());
        std::fs::write(&path, toml).unwrap();

        let config = CoordinatorConfig::from_file(&path).unwrap();
        assert_eq!(config.policy.hook_entity_id, 9);
        assert_eq!(config.policy.period_secs, 604_800);
        // Untouched sections keep their defaults
        assert_eq!(config.modules.validation_entity_id, 2);
        assert_eq!(config.storage.data_dir, "/tmp/subcoord-data");

        std::fs::remove_file(&path).ok();
    }
}
