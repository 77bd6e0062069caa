//! Configuration management for the bridge composer
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex");
}

/// Largest decimals value representable in a 256-bit amount
pub const MAX_TOKEN_DECIMALS: u8 = 77;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bridge: BridgeConfig,
    /// Chains in configuration order; the first two enabled ones are the default pair
    pub chains: Vec<ChainConfig>,
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Default account used as sender and destination address
    pub account: String,
    #[serde(default = "default_gas_limit_buffer")]
    pub gas_limit_buffer_percent: u64,
    #[serde(default = "default_gas_price_buffer")]
    pub gas_price_buffer_percent: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub key: String,
    pub name: String,
    pub network_id: u64,
    pub rpc_urls: Vec<String>,
    pub bridge_address: String,
    pub claim_gas_limit: u64,
    pub gas_price_strategy: GasPriceStrategy,
    pub max_gas_price_gwei: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    Legacy,
    Eip1559,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub native: bool,
    pub logo_uri: Option<String>,
}

fn default_gas_limit_buffer() -> u64 {
    20
}

fn default_gas_price_buffer() -> u64 {
    10
}

fn default_event_capacity() -> usize {
    256
}

fn default_enabled() -> bool {
    true
}

impl Settings {
    /// Load settings from the file named by `TESSERACT_BRIDGE_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TESSERACT_BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        // A bridge needs a source and a distinct destination
        if self.enabled_chains().len() < 2 {
            anyhow::bail!("At least two chains must be enabled");
        }

        let mut keys = HashSet::new();
        for chain in &self.chains {
            if !keys.insert(chain.key.as_str()) {
                anyhow::bail!("Duplicate chain key {}", chain.key);
            }
            if chain.enabled && chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", chain.key);
            }
            if chain.enabled && chain.bridge_address.is_empty() {
                tracing::warn!("Chain {} has no bridge address - fees will assume a plain transfer", chain.key);
            }
        }

        let native = self.tokens.iter().filter(|t| t.native).count();
        if native != 1 {
            anyhow::bail!("Exactly one native token must be configured, found {}", native);
        }

        for token in &self.tokens {
            if token.decimals > MAX_TOKEN_DECIMALS {
                anyhow::bail!("Token {} has too many decimals: {}", token.symbol, token.decimals);
            }
        }

        Ok(())
    }

    /// Get enabled chains in configuration order
    pub fn enabled_chains(&self) -> Vec<&ChainConfig> {
        self.chains.iter().filter(|c| c.enabled).collect()
    }

    /// Get chain config by key
    pub fn get_chain(&self, key: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.key == key)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
